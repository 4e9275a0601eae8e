//! 交互式演示：把一行查询输入编译为 SQL
//!
//! 按输入内容自动选择模式：JSON → 结构化过滤组, SELECT 开头 → RawSQL 校验,
//! 其余 → 过滤DSL

use anyhow::Result;
use log_query_compiler::config::QueryConfig;
use log_query_compiler::{Builder, FilterGroup, Options, Query, QueryBuilder};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const CONFIG_FILE: &str = "query_config.json";

/// 加载配置，失败时回退到默认配置
fn load_config() -> QueryConfig {
    match QueryConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            println!("✅ 成功加载配置文件: {CONFIG_FILE}");
            config
        }
        Err(e) => {
            println!("⚠️ 无法加载配置文件 ({e}), 使用默认配置");
            QueryConfig::default()
        }
    }
}

/// 根据输入内容选择查询模式并编译
fn compile_line(line: &str, options: Options) -> Result<Query> {
    let trimmed = line.trim();
    let builder = if trimmed.starts_with('[') {
        let groups: Vec<FilterGroup> = serde_json::from_str(trimmed)?;
        QueryBuilder::filters(groups, options)
    } else if trimmed.starts_with('{') {
        let group: FilterGroup = serde_json::from_str(trimmed)?;
        QueryBuilder::filters(vec![group], options)
    } else if trimmed.len() >= 6 && trimmed[..6].eq_ignore_ascii_case("select") {
        QueryBuilder::raw(trimmed, options)
    } else {
        QueryBuilder::dsl(trimmed, options)
    };
    Ok(builder.build()?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("--- 日志查询编译器 ---");

    let config = load_config();
    println!("目标表: {}, 默认LIMIT: {}", config.table_name, config.default_limit);
    println!("输入过滤DSL (如 service_name='api')、JSON过滤组或 SELECT 语句, exit 退出\n");

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("query> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                let _ = rl.add_history_entry(&line);

                match compile_line(&line, config.options()) {
                    Ok(query) => {
                        println!("✅ SQL: {}", query.sql);
                        if !query.args.is_empty() {
                            let rendered: Vec<String> =
                                query.args.iter().map(ToString::to_string).collect();
                            println!("   参数: [{}]", rendered.join(", "));
                        }
                    }
                    Err(e) => println!("✗ 编译失败: {e}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
