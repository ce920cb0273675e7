//! Line-oriented session over stdin.
//!
//! The registry lives in memory, so a session is the only way to run
//! several commands against the same slots.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::app::App;
use super::{Cli, Commands};

/// Split a command line into words, honouring double and single quotes
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        anyhow::bail!("Unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Read commands until EOF or `exit`
pub async fn run(app: &mut App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("vidslot shell. Type 'help' for commands, 'exit' to quit.");

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let words = match split_line(&line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("exit") | Some("quit") => break,
            Some("help") => {
                if let Err(e) = Cli::try_parse_from(["vidslot", "--help"]) {
                    let _ = e.print();
                }
                continue;
            }
            Some(_) => {}
        }

        let cli = match Cli::try_parse_from(std::iter::once("vidslot".to_string()).chain(words)) {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        if matches!(cli.command, Commands::Shell) {
            eprintln!("Already in a shell session");
            continue;
        }
        if let Err(e) = super::dispatch(app, cli.command).await {
            eprintln!("Error: {:#}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_line("  play   brand ").unwrap(),
            vec!["play".to_string(), "brand".to_string()]
        );
    }

    #[test]
    fn test_split_quoted_prompt() {
        assert_eq!(
            split_line(r#"generate "a drone shot, 4k" --commit vision"#).unwrap(),
            vec!["generate", "a drone shot, 4k", "--commit", "vision"]
        );
        assert_eq!(split_line("describe ''").unwrap(), vec!["describe", ""]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(split_line("generate \"oops").is_err());
    }
}
