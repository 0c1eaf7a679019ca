//! Shell completion.
//!
//! The shell hands us the words typed after the program name, the last one
//! being the word under the cursor. [`classify`] decides what kind of word
//! is expected there and [`complete`] prints candidates, one per line; the
//! shell does the prefix filtering.

use anyhow::Result;
use clap::{Arg, Command};
use log::debug;
use std::io::Write;

use crate::runtime::Image;

/// What the word under the cursor is expected to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// A positional argument of the subcommand.
    PositionalExpected,
    /// The value of the named flag.
    FlagValueExpected(String),
    /// Nothing command-specific applies: a flag name or a subcommand name.
    Boring,
}

/// Classifies the cursor position of `words` against the command tree `root`.
pub fn classify(root: &Command, words: &[String]) -> CompletionContext {
    let Some((current, before)) = words.split_last() else {
        return CompletionContext::Boring;
    };
    if before.is_empty() || current.starts_with('-') {
        return CompletionContext::Boring;
    }

    if let Some(previous) = before.last() {
        if let Some(flag) = value_flag(root, subcommand(root, before), previous) {
            return CompletionContext::FlagValueExpected(flag);
        }
    }
    CompletionContext::PositionalExpected
}

/// Prints completion candidates for `words` to `out`.
///
/// `image_names` is only called when an image argument is expected. Failing
/// to list images prints nothing, completion never reports errors.
pub fn complete<F, W>(root: &Command, words: &[String], image_names: F, mut out: W) -> Result<()>
where
    F: FnOnce() -> Result<Vec<Image>>,
    W: Write,
{
    let context = classify(root, words);
    debug!("Completion context for {:?}: {:?}", words, context);

    let command = subcommand(root, words.split_last().map_or(&[][..], |(_, before)| before));
    let wants_images = command.is_some_and(|c| c.get_name() == "images");

    match context {
        CompletionContext::PositionalExpected if wants_images => match image_names() {
            Ok(images) => {
                for image in images {
                    writeln!(out, "{}", image.name)?;
                }
            }
            Err(e) => debug!("Failed to list images for completion: {:#}", e),
        },
        CompletionContext::PositionalExpected | CompletionContext::FlagValueExpected(_) => {}
        CompletionContext::Boring => default_complete(root, command, words, &mut out)?,
    }
    Ok(())
}

/// Flags when a flag is being typed, subcommand names otherwise.
fn default_complete<W: Write>(
    root: &Command,
    command: Option<&Command>,
    words: &[String],
    out: &mut W,
) -> Result<()> {
    let typing_flag = words.last().is_some_and(|w| w.starts_with('-'));

    if typing_flag {
        let scopes = std::iter::once(root).chain(command);
        for arg in scopes.flat_map(Command::get_arguments) {
            if arg.is_hide_set() {
                continue;
            }
            if let Some(long) = arg.get_long() {
                writeln!(out, "--{}", long)?;
            }
            if let Some(short) = arg.get_short() {
                writeln!(out, "-{}", short)?;
            }
        }
        writeln!(out, "--help")?;
    } else if command.is_none() {
        for sub in root.get_subcommands().filter(|s| !s.is_hide_set()) {
            writeln!(out, "{}", sub.get_name())?;
        }
    }
    Ok(())
}

/// The first word naming a subcommand of `root`.
fn subcommand<'a>(root: &'a Command, words: &[String]) -> Option<&'a Command> {
    words
        .iter()
        .find_map(|word| root.find_subcommand(word.as_str()))
}

/// The flag name if `word` is a flag (of `root` or `command`) whose value
/// comes in the next word.
fn value_flag(root: &Command, command: Option<&Command>, word: &str) -> Option<String> {
    if word.contains('=') {
        return None;
    }
    let matches_word = |arg: &&Arg| {
        if let Some(long) = word.strip_prefix("--") {
            arg.get_long() == Some(long)
        } else if let Some(short) = word.strip_prefix('-') {
            let mut chars = short.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if arg.get_short() == Some(c))
        } else {
            false
        }
    };

    std::iter::once(root)
        .chain(command)
        .flat_map(Command::get_arguments)
        .find(matches_word)
        .filter(|arg| arg.get_action().takes_values())
        .map(|arg| arg.get_id().as_str().to_string())
}

/// Bash glue calling back into the hidden `__complete` subcommand.
pub fn bash_script(bin: &str) -> String {
    let function = format!("_{}_complete", bin.replace('-', "_"));
    format!(
        r#"# bash completion for {bin}
{function}() {{
    local IFS=$'\n'
    local candidates
    candidates=$("${{COMP_WORDS[0]}}" __complete -- "${{COMP_WORDS[@]:1:$COMP_CWORD}}" 2>/dev/null)
    COMPREPLY=($(compgen -W "$candidates" -- "${{COMP_WORDS[COMP_CWORD]}}"))
}}
complete -o default -F {function} {bin}
"#
    )
}
