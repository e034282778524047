/*
 * Responsibility
 * - コマンドライン引数の定義 (clap derive)
 * - QueryParams への変換
 */
use clap::{Args, Parser, Subcommand};
use jikan_client::QueryParams;

#[derive(Debug, Parser)]
#[command(name = "jikan", about = "Query the Jikan API through the rate-limited cache layer")]
pub struct Cli {
    /// Per-command timeout in seconds.
    #[arg(long, env = "JIKAN_CLI_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one anime by MyAnimeList id.
    Anime {
        id: u32,
        /// Include relations, themes and links.
        #[arg(long)]
        full: bool,
    },
    /// Top anime.
    Top(PageArgs),
    /// Anime airing this season.
    SeasonsNow(PageArgs),
}

#[derive(Debug, Args)]
pub struct PageArgs {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    /// e.g. `airing`, `upcoming`, `bypopularity`, `favorite`.
    #[arg(long)]
    pub filter: Option<String>,
    /// e.g. `tv`, `movie`, `ova`.
    #[arg(long = "type")]
    pub kind: Option<String>,
}

impl PageArgs {
    pub fn to_query(&self) -> QueryParams {
        let mut q = QueryParams::new();
        if let Some(page) = self.page {
            q.set("page", page);
        }
        if let Some(limit) = self.limit {
            q.set("limit", limit);
        }
        if let Some(filter) = &self.filter {
            q.set("filter", filter);
        }
        if let Some(kind) = &self.kind {
            q.set("type", kind);
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_args_become_sorted_query() {
        let cli = Cli::parse_from(["jikan", "top", "--type", "tv", "--page", "2"]);
        let Command::Top(args) = cli.command else {
            panic!("expected top");
        };
        assert_eq!(args.to_query().encode(), "page=2&type=tv");
    }

    #[test]
    fn anime_full_flag() {
        let cli = Cli::parse_from(["jikan", "anime", "21", "--full"]);
        assert!(matches!(cli.command, Command::Anime { id: 21, full: true }));
    }
}
