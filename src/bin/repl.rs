use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use lazyscheme::config::ReplConfig;
use lazyscheme::syntax::KEYWORDS;
use lazyscheme::{PrimOp, Session, TokenKind, Value, logging, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use tracing::{debug, warn};

const REPL_NAME: &str = "REPL";

type SharedSession = Rc<RefCell<Session<io::Stdout>>>;

struct LazyCompleter {
    session: SharedSession,
}

impl LazyCompleter {
    fn new(session: SharedSession) -> Self {
        LazyCompleter { session }
    }

    fn candidates(&self) -> HashSet<String> {
        let mut ids = self.session.borrow().env().identifiers();
        ids.extend(KEYWORDS.iter().map(|kw| kw.to_string()));
        ids.extend(PrimOp::ALL.iter().map(|op| op.name().to_string()));
        ids
    }
}

impl rustyline::completion::Completer for LazyCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = match tokenize(&line[..pos]) {
            Ok(tokens) => match tokens.last().map(|t| &t.kind) {
                Some(TokenKind::Symbol(prefix)) if line[..pos].ends_with(prefix.as_str()) => {
                    prefix.clone()
                }
                _ => return Ok((pos, vec![])),
            },
            Err(_) => return Ok((pos, vec![])),
        };
        let mut completions: Vec<String> = self
            .candidates()
            .into_iter()
            .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
            .collect();
        completions.sort();
        Ok((pos, completions))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: BracketValidator,
    #[rustyline(Highlighter)]
    highlighter: BracketHighlighter,
    #[rustyline(Completer)]
    completer: LazyCompleter,
}

/// Asks for more input until every bracket outside a string is closed.
struct BracketValidator;

impl Validator for BracketValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut in_comment = false;
        let mut escape = false;

        for (i, c) in ctx.input().chars().enumerate() {
            if in_comment {
                in_comment = c != '\n';
                continue;
            }
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                ';' => in_comment = true,
                '(' => depth += 1,
                ')' => match depth.checked_sub(1) {
                    Some(d) => depth = d,
                    None => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched ')' at position {}",
                            i
                        ))));
                    }
                },
                _ => {}
            }
        }

        if in_string || depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Colours strings green and the bracket pair around the cursor blue;
/// unmatched closing brackets turn red. Comments are left as they are.
struct BracketHighlighter;

impl Highlighter for BracketHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        // Byte offsets of open brackets, in `highlighted` and in `line`
        let mut open: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_string = false;
        let mut in_comment = false;
        let mut escape = false;

        for (i, c) in line.char_indices() {
            if in_comment {
                in_comment = c != '\n';
                highlighted.push(c);
                continue;
            }
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c));
                continue;
            }

            match c {
                '"' => {
                    in_string = true;
                    highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c));
                }
                ';' => {
                    in_comment = true;
                    highlighted.push(c);
                }
                '(' => {
                    open.push((highlighted.len(), i));
                    highlighted.push(c);
                }
                ')' => match open.pop() {
                    Some((matching_pos, open_idx)) if open_idx + 1 == pos || i + 1 == pos => {
                        highlighted.push_str("\x1b[34m)\x1b[0m");
                        highlighted.replace_range(matching_pos..=matching_pos, "\x1b[1;34m(\x1b[0m");
                    }
                    Some(_) => highlighted.push(c),
                    None => highlighted.push_str("\x1b[31m)\x1b[0m"),
                },
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn print_result(session: &SharedSession, line: &str) {
    let result = session.borrow_mut().eval_source(line);
    let value = match result {
        Ok(Some(value)) => value,
        // A definition has no value to show
        Ok(None) => return,
        Err(e) => return report(&e, line),
    };
    // Show the value a pending promise stands for, not the promise
    let forced = match value {
        Value::Promise(_) => session.borrow_mut().force(value),
        value => Ok(value),
    };
    match forced {
        Ok(value) => println!("{}", value),
        Err(e) => report(&e, line),
    }
}

fn report(e: &lazyscheme::EvalError, line: &str) {
    if let Err(io_err) = e.pretty_print(REPL_NAME, line) {
        warn!(%io_err, "could not render error report");
        eprintln!("Error: {}", e);
    }
}

fn main() -> rustyline::Result<()> {
    logging::init();
    println!("lazyscheme REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let config = match ReplConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}; using defaults", e);
            ReplConfig::default()
        }
    };
    debug!(?config, "starting REPL");

    let session: SharedSession = Rc::new(RefCell::new(Session::stdout()));
    let h = InputValidator {
        highlighter: BracketHighlighter,
        validator: BracketValidator,
        completer: LazyCompleter::new(session.clone()),
    };
    let editor_config = rustyline::config::Config::builder()
        .edit_mode(config.edit_mode.into())
        .build();
    let mut rl = Editor::with_config(editor_config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&config.history_file).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline(&config.prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }
                print_result(&session, trimmed_input);
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&config.history_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCHED_CLOSE: &str = "\x1b[34m)\x1b[0m";
    const UNMATCHED_CLOSE: &str = "\x1b[31m)\x1b[0m";

    fn highlight(line: &str, pos: usize) -> String {
        BracketHighlighter.highlight(line, pos).into_owned()
    }

    #[test]
    fn test_highlight_matching_pair_at_cursor() {
        let out = highlight("(f x)", 5);
        assert!(out.contains(MATCHED_CLOSE), "Output: {:?}", out);
        assert!(out.starts_with("\x1b[1;34m(\x1b[0m"), "Output: {:?}", out);
    }

    #[test]
    fn test_highlight_after_multibyte_chars() {
        // 'λ' takes two bytes, so the closing bracket ends at byte 6
        let out = highlight("(λ x)", 6);
        assert!(out.contains(MATCHED_CLOSE), "Output: {:?}", out);
    }

    #[test]
    fn test_highlight_ignores_comments() {
        assert_eq!(highlight("1 ; ) \"s\"", 0), "1 ; ) \"s\"");
        let out = highlight(")", 0);
        assert!(out.contains(UNMATCHED_CLOSE), "Output: {:?}", out);
    }

    #[test]
    fn test_comment_ends_at_newline() {
        let out = highlight("; (\n)", 0);
        assert!(out.contains(UNMATCHED_CLOSE), "Output: {:?}", out);
    }
}
