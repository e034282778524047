/*
 * Responsibility
 * - tracing 初期化 → Config 読み込み → JikanClient 組み立て
 * - サブコマンドの実行と結果 (JSON) の出力
 * - Ctrl-C で Context をキャンセル
 */
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use jikan_client::{ClientConfig, Context, FetchResult, JikanClient};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

pub async fn run() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let client = JikanClient::from_config(&config).await?;

    let ctx = Context::with_timeout(Duration::from_secs(cli.timeout));
    let on_signal = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match &cli.command {
        Command::Anime { id, full: false } => {
            let res = client.anime().get_by_id(&ctx, *id).await?;
            print(&res, cli.compact)
        }
        Command::Anime { id, full: true } => {
            let res = client.anime().get_full_by_id(&ctx, *id).await?;
            print(&res, cli.compact)
        }
        Command::Top(args) => {
            let res = client.top().anime(&ctx, &args.to_query()).await?;
            print(&res, cli.compact)
        }
        Command::SeasonsNow(args) => {
            let res = client.seasons().now(&ctx, &args.to_query()).await?;
            print(&res, cli.compact)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print<T: Serialize>(res: &FetchResult<T>, compact: bool) -> Result<()> {
    info!(
        origin = ?res.origin,
        status = res.meta.as_ref().map(|m| m.status.as_u16()),
        "fetched"
    );

    let out = if compact {
        serde_json::to_string(&res.data)?
    } else {
        serde_json::to_string_pretty(&res.data)?
    };
    println!("{out}");
    Ok(())
}
