//! Command-line parsing
//!
//! A line goes through variable substitution, leading-alias expansion and
//! tokenization, in that order.

use crate::{Result, ShellError};
use std::collections::BTreeMap;

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Pipe,
    RedirectOut,
    RedirectAppend,
}

/// Output redirection attached to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub append: bool,
}

/// A single parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub name: String,
    pub args: Vec<String>,
    pub redirect: Option<Redirect>,
}

impl CommandLine {
    /// Build from tokens. Pipes are rejected; `None` for an empty line.
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Option<Self>> {
        if tokens.is_empty() {
            return Ok(None);
        }
        if tokens.contains(&Token::Pipe) {
            return Err(ShellError::Unsupported("multi-stage pipelines".to_string()));
        }

        let mut words = Vec::new();
        let mut redirect = None;
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            match token {
                Token::Word(word) => words.push(word),
                Token::RedirectOut | Token::RedirectAppend => {
                    let append = token == Token::RedirectAppend;
                    match iter.next() {
                        Some(Token::Word(target)) => redirect = Some(Redirect { target, append }),
                        _ => {
                            return Err(ShellError::InvalidArgument(
                                "syntax error near unexpected token `newline'".to_string(),
                            ))
                        }
                    }
                }
                Token::Pipe => {}
            }
        }

        if words.is_empty() {
            return Err(ShellError::InvalidArgument(
                "syntax error: missing command".to_string(),
            ));
        }
        let name = words.remove(0);
        Ok(Some(Self {
            name,
            args: words,
            redirect,
        }))
    }
}

/// Replace `$NAME` and `${NAME}` with values from `env`.
///
/// Unknown names become empty. Nothing inside single quotes is touched, and
/// backslash escapes are left for the tokenizer. Substituted values are
/// escaped so the tokenizer reads them as plain text; outside double quotes
/// they are still split on whitespace.
pub fn substitute_env(line: &str, env: &BTreeMap<String, String>) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            out.push(c);
            i += 1;
            continue;
        }
        match c {
            '\'' if !in_double => {
                in_single = true;
                out.push(c);
                i += 1;
            }
            '"' => {
                in_double = !in_double;
                out.push(c);
                i += 1;
            }
            '\\' => {
                out.push(c);
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            '$' => {
                let (name, consumed) = variable_name(&chars[i + 1..]);
                match name {
                    Some(name) => {
                        if let Some(value) = env.get(&name) {
                            push_literal(&mut out, value, in_double);
                        }
                        i += 1 + consumed;
                    }
                    None => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Append `value` with every character the tokenizer would treat as syntax
/// escaped.
fn push_literal(out: &mut String, value: &str, in_double: bool) {
    for c in value.chars() {
        let special = if in_double {
            matches!(c, '"' | '\\' | '$')
        } else {
            matches!(c, '\'' | '"' | '\\' | '$' | '|' | '>')
        };
        if special {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Parse a variable reference following `$`; returns the name and how many
/// characters it used.
fn variable_name(rest: &[char]) -> (Option<String>, usize) {
    if rest.first() == Some(&'{') {
        return match rest.iter().position(|&c| c == '}') {
            Some(end) if end > 1 => (Some(rest[1..end].iter().collect()), end + 1),
            _ => (None, 0),
        };
    }
    let len = rest
        .iter()
        .enumerate()
        .take_while(|(i, c)| c.is_ascii_alphabetic() || **c == '_' || (*i > 0 && c.is_ascii_digit()))
        .count();
    if len == 0 {
        (None, 0)
    } else {
        (Some(rest[..len].iter().collect()), len)
    }
}

/// Replace the first word with its alias, if it has one. Not recursive.
pub fn expand_alias(line: &str, aliases: &BTreeMap<String, String>) -> String {
    let trimmed = line.trim_start();
    let (first, rest) = match trimmed.find(char::is_whitespace) {
        Some(index) => trimmed.split_at(index),
        None => (trimmed, ""),
    };
    match aliases.get(first) {
        Some(value) => format!("{}{}", value, rest),
        None => line.to_string(),
    }
}

/// Split a line into words and operators, honouring quotes and escapes.
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars().peekable();

    fn flush(tokens: &mut Vec<Token>, word: &mut String, in_word: &mut bool) {
        if *in_word {
            tokens.push(Token::Word(std::mem::take(word)));
            *in_word = false;
        }
    }

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => flush(&mut tokens, &mut word, &mut in_word),
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => word.push(inner),
                        None => return Err(unterminated('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.peek() {
                            Some(&next) if matches!(next, '"' | '\\' | '$') => {
                                word.push(next);
                                chars.next();
                            }
                            _ => word.push('\\'),
                        },
                        Some(inner) => word.push(inner),
                        None => return Err(unterminated('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                word.push(chars.next().unwrap_or('\\'));
            }
            '|' => {
                flush(&mut tokens, &mut word, &mut in_word);
                tokens.push(Token::Pipe);
            }
            '>' => {
                flush(&mut tokens, &mut word, &mut in_word);
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::RedirectAppend);
                } else {
                    tokens.push(Token::RedirectOut);
                }
            }
            other => {
                in_word = true;
                word.push(other);
            }
        }
    }
    flush(&mut tokens, &mut word, &mut in_word);
    Ok(tokens)
}

fn unterminated(quote: char) -> ShellError {
    ShellError::InvalidArgument(format!(
        "unexpected EOF while looking for matching `{}'",
        quote
    ))
}

/// Split short flags (`-la` → `l`, `a`) from operands. `--` ends flags.
pub fn split_flags(args: &[String]) -> (Vec<char>, Vec<String>) {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    let mut flags_done = false;
    for arg in args {
        if !flags_done && arg == "--" {
            flags_done = true;
        } else if !flags_done && arg.len() > 1 && arg.starts_with('-') {
            flags.extend(arg.chars().skip(1));
        } else {
            operands.push(arg.clone());
        }
    }
    (flags, operands)
}

/// Translate a shell glob (`*`, `?`) into an anchored regex source.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("HOME".to_string(), "/home/user".to_string());
        env.insert("NAME".to_string(), "neo".to_string());
        env
    }

    fn words(line: &str) -> Vec<String> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .filter_map(|t| match t {
                Token::Word(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_substitution_forms() {
        let env = env();
        assert_eq!(substitute_env("cd $HOME", &env), "cd /home/user");
        assert_eq!(substitute_env("echo ${NAME}!", &env), "echo neo!");
        assert_eq!(substitute_env("echo $MISSING.", &env), "echo .");
        assert_eq!(substitute_env("echo '$HOME'", &env), "echo '$HOME'");
        assert_eq!(substitute_env("echo \"$HOME\"", &env), "echo \"/home/user\"");
        assert_eq!(substitute_env("echo \\$HOME", &env), "echo \\$HOME");
        assert_eq!(substitute_env("echo $ 5$", &env), "echo $ 5$");
        assert_eq!(substitute_env("echo ${broken", &env), "echo ${broken");
    }

    #[test]
    fn test_substituted_values_stay_literal() {
        let mut env = env();
        env.insert("Q".to_string(), "it's".to_string());
        env.insert("P".to_string(), "a|b > c".to_string());

        assert_eq!(words(&substitute_env("echo $Q", &env)), vec!["echo", "it's"]);
        assert_eq!(words(&substitute_env("echo \"$Q\"", &env)), vec!["echo", "it's"]);
        assert_eq!(
            words(&substitute_env("echo $P", &env)),
            vec!["echo", "a|b", ">", "c"]
        );
        assert_eq!(words(&substitute_env("echo \"$P\"", &env)), vec!["echo", "a|b > c"]);
        assert!(tokenize(&substitute_env("echo $P", &env))
            .unwrap()
            .iter()
            .all(|token| matches!(token, Token::Word(_))));
    }

    #[test]
    fn test_alias_expansion() {
        let mut aliases = BTreeMap::new();
        aliases.insert("ll".to_string(), "ls -l".to_string());
        assert_eq!(expand_alias("ll /tmp", &aliases), "ls -l /tmp");
        assert_eq!(expand_alias("ll", &aliases), "ls -l");
        assert_eq!(expand_alias("echo ll", &aliases), "echo ll");
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        assert_eq!(words("echo \"hello world\" 'a b'"), vec!["echo", "hello world", "a b"]);
        assert_eq!(words("alias ll='ls -l'"), vec!["alias", "ll=ls -l"]);
        assert_eq!(words("echo a\\ b"), vec!["echo", "a b"]);
        assert_eq!(words("echo \"\""), vec!["echo", ""]);
        assert_eq!(words("echo \"say \\\"hi\\\"\""), vec!["echo", "say \"hi\""]);
        assert!(tokenize("echo \"open").is_err());
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            tokenize("echo hi>>log").unwrap(),
            vec![
                Token::Word("echo".into()),
                Token::Word("hi".into()),
                Token::RedirectAppend,
                Token::Word("log".into()),
            ]
        );
        assert_eq!(
            tokenize("echo 'a|b'").unwrap(),
            vec![Token::Word("echo".into()), Token::Word("a|b".into())]
        );
    }

    #[test]
    fn test_command_line() {
        let parsed = CommandLine::from_tokens(tokenize("echo hi > f.txt").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(parsed.name, "echo");
        assert_eq!(parsed.args, vec!["hi"]);
        assert_eq!(
            parsed.redirect,
            Some(Redirect {
                target: "f.txt".into(),
                append: false
            })
        );

        assert!(matches!(
            CommandLine::from_tokens(tokenize("ls | grep x").unwrap()),
            Err(ShellError::Unsupported(_))
        ));
        assert!(matches!(
            CommandLine::from_tokens(tokenize("echo hi >").unwrap()),
            Err(ShellError::InvalidArgument(_))
        ));
        assert_eq!(CommandLine::from_tokens(Vec::new()).unwrap(), None);
    }

    #[test]
    fn test_split_flags() {
        let args: Vec<String> = ["-la", "dir", "--", "-x"].iter().map(|s| s.to_string()).collect();
        let (flags, operands) = split_flags(&args);
        assert_eq!(flags, vec!['l', 'a']);
        assert_eq!(operands, vec!["dir", "-x"]);
    }

    #[test]
    fn test_glob_to_regex() {
        let re = regex::Regex::new(&glob_to_regex("*.log")).unwrap();
        assert!(re.is_match("auth.log"));
        assert!(!re.is_match("auth.log.1"));
        let re = regex::Regex::new(&glob_to_regex("file?.txt")).unwrap();
        assert!(re.is_match("file1.txt"));
        assert!(!re.is_match("file10.txt"));
    }
}
