//! Line-oriented filter session.
//!
//! Each command that changes the selection triggers one full recomputation of
//! the dashboard. Only values observed in the dataset can be selected.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::engine::filter::{FilterOptions, FilterSelection};
use crate::engine::{Snapshot, recompute};
use crate::report::{RenderOptions, render_dashboard, render_json, render_options};

pub const HELP: &str = "\
Commands:
  show                      redraw the dashboard
  json                      print the current snapshot as JSON
  options                   list the values each filter accepts
  year  <v1, v2, ...|all|none>
  level <v1, v2, ...|all|none>
  title <v1, v2, ...|all|none>
  size  <v1, v2, ...|all|none>
  rows <n>                  number of detail rows to print
  reset                     select everything again
  help                      this text
  quit                      leave";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown command '{0}', type 'help' for the list")]
    UnknownCommand(String),

    #[error("'{0}' needs a value")]
    MissingArgument(&'static str),

    #[error("invalid year: {0}")]
    InvalidYear(String),

    #[error("invalid row count: {0}")]
    InvalidRowCount(String),

    #[error("malformed value list: {0}")]
    MalformedList(&'static str),

    #[error("unknown {dimension} value(s): {values}")]
    UnknownValue { dimension: Dimension, values: String },

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A filter dimension of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Year,
    ExperienceLevel,
    JobTitle,
    CompanySize,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Year => "year",
            Dimension::ExperienceLevel => "level",
            Dimension::JobTitle => "title",
            Dimension::CompanySize => "size",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSet {
    All,
    None,
    Values(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Json,
    Options,
    Select(Dimension, ValueSet),
    Rows(usize),
    Reset,
    Help,
    Quit,
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Text(String),
    Quit,
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, SessionError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((line, ""));

    let select = |dimension: Dimension, name: &'static str| {
        parse_value_set(rest, name).map(|set| Command::Select(dimension, set))
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "show" => Command::Show,
        "json" => Command::Json,
        "options" => Command::Options,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "year" | "years" => select(Dimension::Year, "year")?,
        "level" | "levels" => select(Dimension::ExperienceLevel, "level")?,
        "title" | "titles" => select(Dimension::JobTitle, "title")?,
        "size" | "sizes" => select(Dimension::CompanySize, "size")?,
        "rows" => {
            if rest.is_empty() {
                return Err(SessionError::MissingArgument("rows"));
            }
            let n = rest
                .parse::<usize>()
                .map_err(|_| SessionError::InvalidRowCount(rest.to_string()))?;
            Command::Rows(n)
        }
        other => return Err(SessionError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

fn parse_value_set(rest: &str, name: &'static str) -> Result<ValueSet, SessionError> {
    match rest.to_ascii_lowercase().as_str() {
        "" => Err(SessionError::MissingArgument(name)),
        "all" | "*" => Ok(ValueSet::All),
        "none" => Ok(ValueSet::None),
        _ => split_values(rest).map(ValueSet::Values),
    }
}

/// Splits a comma-separated value list. Items may be double-quoted so they can
/// contain commas; quotes inside an item are not supported, as in the dataset.
fn split_values(list: &str) -> Result<Vec<String>, SessionError> {
    let mut values = Vec::new();
    let mut rest = list.trim_start();

    while !rest.is_empty() {
        let (value, tail) = match rest.strip_prefix('"') {
            Some(quoted) => {
                let close = quoted
                    .find('"')
                    .ok_or(SessionError::MalformedList("unterminated quoted value"))?;
                (&quoted[..close], quoted[close + 1..].trim_start())
            }
            None => {
                let end = rest.find(',').unwrap_or(rest.len());
                let value = rest[..end].trim();
                if value.contains('"') {
                    return Err(SessionError::MalformedList("quote inside unquoted value"));
                }
                (value, &rest[end..])
            }
        };

        rest = match tail.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if tail.is_empty() => tail,
            None => {
                return Err(SessionError::MalformedList(
                    "unexpected character after closing quote",
                ));
            }
        };
        if !value.is_empty() {
            values.push(value.to_string());
        }
    }

    Ok(values)
}

/// Filter state of one interactive user.
#[derive(Debug)]
pub struct Session<'a> {
    dataset: &'a Dataset,
    options: FilterOptions,
    selection: FilterSelection,
    render: RenderOptions,
}

impl<'a> Session<'a> {
    /// Starts with every observed value selected.
    pub fn new(dataset: &'a Dataset, render: RenderOptions) -> Self {
        let options = FilterOptions::from_dataset(dataset);
        let selection = options.select_all();
        Session {
            dataset,
            options,
            selection,
            render,
        }
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn snapshot(&self) -> Snapshot<'a> {
        recompute(self.dataset, &self.selection)
    }

    pub fn dashboard(&self) -> String {
        render_dashboard(&self.snapshot(), &self.render)
    }

    pub fn execute(&mut self, command: Command) -> Result<Output, SessionError> {
        debug!(?command, "executing session command");

        let text = match command {
            Command::Quit => return Ok(Output::Quit),
            Command::Help => HELP.to_string(),
            Command::Options => render_options(&self.options),
            Command::Show => self.dashboard(),
            Command::Json => render_json(&self.snapshot())?,
            Command::Rows(n) => {
                self.render.detail_rows = n;
                self.dashboard()
            }
            Command::Reset => {
                self.selection = self.options.select_all();
                self.dashboard()
            }
            Command::Select(dimension, values) => {
                self.select(dimension, values)?;
                self.dashboard()
            }
        };

        Ok(Output::Text(text))
    }

    /// Reads commands from `input` until it ends or `quit` is given, writing each
    /// result to `output`. Rejected commands are reported and the loop goes on.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
        prompt: bool,
    ) -> io::Result<()> {
        writeln!(output, "{}", self.dashboard())?;
        if prompt {
            writeln!(output, "Type 'help' for the list of commands.")?;
            write!(output, "> ")?;
            output.flush()?;
        }

        for line in input.lines() {
            let line = line?;
            let result = parse_command(&line)
                .and_then(|command| command.map(|c| self.execute(c)).transpose());

            match result {
                Ok(None) => {}
                Ok(Some(Output::Quit)) => break,
                Ok(Some(Output::Text(text))) => writeln!(output, "{text}")?,
                Err(err) => {
                    warn!(%err, "command rejected");
                    writeln!(output, "error: {err}")?;
                }
            }

            if prompt {
                write!(output, "> ")?;
                output.flush()?;
            }
        }
        Ok(())
    }

    fn select(&mut self, dimension: Dimension, values: ValueSet) -> Result<(), SessionError> {
        match dimension {
            Dimension::Year => {
                let years = match values {
                    ValueSet::All => self.options.years.clone(),
                    ValueSet::None => BTreeSet::new(),
                    ValueSet::Values(raw) => {
                        let years = raw
                            .iter()
                            .map(|v| {
                                v.parse::<i64>()
                                    .map_err(|_| SessionError::InvalidYear(v.clone()))
                            })
                            .collect::<Result<BTreeSet<i64>, _>>()?;
                        let unknown: Vec<String> = years
                            .difference(&self.options.years)
                            .map(i64::to_string)
                            .collect();
                        if !unknown.is_empty() {
                            return Err(SessionError::UnknownValue {
                                dimension,
                                values: unknown.join(", "),
                            });
                        }
                        years
                    }
                };
                self.selection.years = years;
            }
            Dimension::ExperienceLevel => {
                self.selection.experience_levels =
                    resolve(dimension, values, &self.options.experience_levels)?;
            }
            Dimension::JobTitle => {
                self.selection.job_titles = resolve(dimension, values, &self.options.job_titles)?;
            }
            Dimension::CompanySize => {
                self.selection.company_sizes =
                    resolve(dimension, values, &self.options.company_sizes)?;
            }
        }
        Ok(())
    }
}

fn resolve(
    dimension: Dimension,
    values: ValueSet,
    observed: &BTreeSet<String>,
) -> Result<BTreeSet<String>, SessionError> {
    match values {
        ValueSet::All => Ok(observed.clone()),
        ValueSet::None => Ok(BTreeSet::new()),
        ValueSet::Values(raw) => {
            let unknown: Vec<&str> = raw
                .iter()
                .filter(|v| !observed.contains(v.as_str()))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(SessionError::UnknownValue {
                    dimension,
                    values: unknown.join(", "),
                });
            }
            Ok(raw.into_iter().collect())
        }
    }
}
