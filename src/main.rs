//! Talent Match 命令行入口
//!
//! 用法：`talent-match <需求文本|需求文件> [档案目录]`
//! 初始化日志、加载配置、建立档案库，运行一次匹配并以 JSON 输出排序结果。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use talent_match::{config::load_config, observability, MatchBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let requirement_arg = args
        .next()
        .context("usage: talent-match <requirement text|file> [profiles dir]")?;
    let profiles_dir = args.next().map(PathBuf::from);

    let requirement = if std::path::Path::new(&requirement_arg).is_file() {
        std::fs::read_to_string(&requirement_arg)
            .with_context(|| format!("Failed to read requirement file {}", requirement_arg))?
    } else {
        requirement_arg
    };

    let config_path = std::env::var("TALENT_CONFIG").ok().map(PathBuf::from);
    let mut cfg = load_config(config_path).context("Failed to load config")?;
    if profiles_dir.is_some() {
        cfg.index.profiles_dir = profiles_dir;
    }

    let builder = MatchBuilder::new(cfg);
    let llm = builder.llm();
    let store = Arc::new(builder.build_store());
    let total = builder
        .index_profiles(&store, llm)
        .await
        .context("Failed to index profiles")?;
    tracing::info!(total, "profile store ready");

    let orchestrator = builder.build(store);
    let run = orchestrator
        .run(&requirement)
        .await
        .context("Matching run failed")?;
    tracing::info!(
        run_id = %run.run_id,
        iterations = run.iterations,
        retried = run.retried,
        "done"
    );

    println!("{}", serde_json::to_string_pretty(&run.results)?);
    Ok(())
}
