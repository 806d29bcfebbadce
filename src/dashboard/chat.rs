use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{SAMPLE_QUESTIONS, render_index_stats, render_outcome};
use crate::app::AppContext;
use crate::error::RagError;

/// 交互模式下的一行输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Quit,
    Help,
    Samples,
    Stats,
    Unknown(String),
    Question(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        if !line.starts_with('/') {
            return ChatInput::Question(line.to_string());
        }

        match line.to_lowercase().as_str() {
            "/quit" | "/exit" | "/q" => ChatInput::Quit,
            "/help" | "/?" => ChatInput::Help,
            "/samples" => ChatInput::Samples,
            "/stats" => ChatInput::Stats,
            other => {
                // "/1" 到 "/4" 直接提问对应的示例问题
                if let Ok(n) = other[1..].parse::<usize>()
                    && (1..=SAMPLE_QUESTIONS.len()).contains(&n)
                {
                    return ChatInput::Question(SAMPLE_QUESTIONS[n - 1].to_string());
                }
                ChatInput::Unknown(line.to_string())
            }
        }
    }
}

pub const HELP: &str = "命令: /samples 示例问题, /1../4 提问示例问题, /stats 索引统计, /quit 退出；请求进行中按 Ctrl-C 取消";

/// 逐行读取问题并回答，直到 /quit 或输入结束
pub async fn run(app: &AppContext, max_iterations: usize) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("💬 EchoCheck 交互模式，{}", HELP);

    loop {
        stdout.write_all("\n❓ > ".as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => println!("{}", HELP),
            ChatInput::Samples => {
                for (i, question) in SAMPLE_QUESTIONS.iter().enumerate() {
                    println!("   /{} {}", i + 1, question);
                }
            }
            ChatInput::Stats => {
                let stats = app.index.read().await.stats();
                print!("{}", render_index_stats(&stats));
            }
            ChatInput::Unknown(command) => {
                println!("⚠️ 未知命令: {}，{}", command, HELP);
            }
            ChatInput::Question(question) => {
                let result = app.ask_interruptible(&question, max_iterations).await;
                match result {
                    Ok(outcome) => print!("{}", render_outcome(&outcome)),
                    Err(RagError::Cancelled) => println!("⏹️ 已取消"),
                    Err(e) => println!("❌ {} ({})", e, e.kind()),
                }
            }
        }
    }

    println!("👋 再见");
    Ok(())
}
