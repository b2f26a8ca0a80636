use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use godisk_api::ReportKind;
use godisk_console::{Console, ConsoleSurfaces, DispatchOutcome};
use rustyline::{error::ReadlineError, history::DefaultHistory, Config as ReadlineConfig, Editor};

use crate::render::render_surfaces;
use crate::script_input::{merge_scripts, read_script_files};

const REPL_PROMPT: &str = "godisk> ";
const REPL_CONTINUATION_PROMPT: &str = "   ...> ";
const REPL_HISTORY_FILE: &str = "repl_history.txt";
const REPL_HELP: &str = "Type script lines; a blank line runs them.\n\
:load <file>   append a script file to the buffer\n\
:clear         drop the buffered lines\n\
:tree <n>      select tree node n\n\
:inode <n>     open inode n from the inode listing\n\
:close <kind>  close a report (mbr, disk, tree, ...)\n\
:quit          leave";

#[derive(Debug, Default)]
/// Lines typed so far; a blank line hands the whole buffer over.
struct ScriptBuffer {
    lines: Vec<String>,
}

impl ScriptBuffer {
    fn push_line(&mut self, line: String) -> Option<String> {
        if line.trim().is_empty() {
            if self.lines.is_empty() {
                return None;
            }
            let script = self.lines.join("\n");
            self.lines.clear();
            return Some(script);
        }
        self.lines.push(line);
        None
    }

    fn append_script(&mut self, script: &str) {
        let merged = merge_scripts(&[self.lines.join("\n"), script.to_string()]);
        self.lines = merged.lines().map(ToOwned::to_owned).collect();
    }

    fn prompt(&self) -> &'static str {
        if self.lines.is_empty() {
            REPL_PROMPT
        } else {
            REPL_CONTINUATION_PROMPT
        }
    }

    fn has_pending(&self) -> bool {
        !self.lines.is_empty()
    }

    fn clear(&mut self) {
        self.lines.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplDirective {
    Help,
    Quit,
    Clear,
    Load(PathBuf),
    SelectTree(i64),
    SelectInode(i64),
    Close(ReportKind),
}

fn parse_repl_directive(line: &str) -> Option<Result<ReplDirective, String>> {
    let trimmed = line.trim();
    let body = trimmed.strip_prefix(':')?;
    let (name, argument) = body
        .split_once(char::is_whitespace)
        .map(|(name, argument)| (name, argument.trim()))
        .unwrap_or((body, ""));
    let index = || {
        argument
            .parse::<i64>()
            .map_err(|_| format!("expected a number, got '{argument}'"))
    };
    let directive = match name {
        "help" | "h" => Ok(ReplDirective::Help),
        "quit" | "q" | "exit" => Ok(ReplDirective::Quit),
        "clear" => Ok(ReplDirective::Clear),
        "load" if !argument.is_empty() => Ok(ReplDirective::Load(PathBuf::from(argument))),
        "load" => Err("usage: :load <file>".to_string()),
        "tree" => index().map(ReplDirective::SelectTree),
        "inode" => index().map(ReplDirective::SelectInode),
        "close" => ReportKind::from_name(argument)
            .map(ReplDirective::Close)
            .ok_or_else(|| format!("unknown report kind '{argument}'")),
        other => Err(format!("unknown command ':{other}' (try :help)")),
    };
    Some(directive)
}

fn build_repl_editor() -> Result<Editor<(), DefaultHistory>> {
    let config = ReadlineConfig::builder().build();
    Editor::<(), DefaultHistory>::with_config(config)
        .context("failed to initialize interactive editor")
}

fn load_repl_history(editor: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Err(error) = editor.load_history(path) {
        if !matches!(
            error,
            ReadlineError::Io(ref io_error) if io_error.kind() == std::io::ErrorKind::NotFound
        ) {
            eprintln!(
                "warning: failed to load REPL history from {}: {error}",
                path.display()
            );
        }
    }
}

fn save_repl_history(editor: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                eprintln!(
                    "warning: failed to create REPL history directory {}: {error}",
                    parent.display()
                );
                return;
            }
        }
    }
    if let Err(error) = editor.save_history(path) {
        eprintln!(
            "warning: failed to save REPL history to {}: {error}",
            path.display()
        );
    }
}

async fn submit(console: &Console, script: &str) {
    tokio::select! {
        outcome = console.execute(script) => {
            if outcome == DispatchOutcome::RejectedBusy {
                eprintln!("a script is still running");
                return;
            }
            print!("{}", render_surfaces(&console.snapshot()));
        }
        _ = tokio::signal::ctrl_c() => {
            console.cancel();
            eprintln!("cancelled");
        }
    }
}

async fn apply_directive(
    console: &Console,
    buffer: &mut ScriptBuffer,
    directive: ReplDirective,
) -> bool {
    match directive {
        ReplDirective::Help => println!("{REPL_HELP}"),
        ReplDirective::Quit => return false,
        ReplDirective::Clear => buffer.clear(),
        ReplDirective::Load(path) => match read_script_files(&[path]) {
            Ok(script) => {
                buffer.append_script(&script);
                println!("{}", buffer.lines.join("\n"));
            }
            Err(error) => eprintln!("{error:#}"),
        },
        ReplDirective::SelectTree(index) => {
            if console.select_tree_node(index) {
                print!("{}", render_surfaces(&console.snapshot()));
            } else {
                eprintln!("no tree node #{index}");
            }
        }
        ReplDirective::SelectInode(index) => match console.select_inode(index).await {
            Ok(_) => print!("{}", render_surfaces(&console.snapshot())),
            Err(error) => eprintln!("Error: {}", error.user_message()),
        },
        ReplDirective::Close(kind) => console.dismiss(kind),
    }
    true
}

pub(crate) async fn run_repl(console: Arc<Console>, state_dir: &Path) -> Result<()> {
    console.subscribe(Arc::new(|surfaces: &ConsoleSurfaces| {
        if surfaces.busy {
            eprintln!("… ejecutando");
        }
    }));

    let mut editor = build_repl_editor()?;
    let history_path = state_dir.join(REPL_HISTORY_FILE);
    load_repl_history(&mut editor, &history_path);
    let mut buffer = ScriptBuffer::default();
    println!("{REPL_HELP}");

    loop {
        let prompt = buffer.prompt();
        let readline = tokio::task::block_in_place(|| editor.readline(prompt));
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if buffer.has_pending() {
                    buffer.clear();
                    println!();
                    continue;
                }
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(error) => return Err(anyhow!("failed to read interactive input: {error}")),
        };

        if !buffer.has_pending() {
            if let Some(directive) = parse_repl_directive(&line) {
                let _ = editor.add_history_entry(line.as_str());
                match directive {
                    Ok(directive) => {
                        if !apply_directive(&console, &mut buffer, directive).await {
                            break;
                        }
                    }
                    Err(message) => eprintln!("{message}"),
                }
                continue;
            }
        }

        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }
        if let Some(script) = buffer.push_line(line) {
            submit(&console, &script).await;
        }
    }

    save_repl_history(&mut editor, &history_path);
    Ok(())
}
