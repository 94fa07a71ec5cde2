//! The `.con` configuration file format.
//!
//! ```text
//! N                     number of annotations
//! text / x / y          three lines per annotation
//! t / b / l / r         four lines per cell, x outer, y inner
//! newRow                between consecutive x columns
//! ```
//!
//! Every value is followed by a newline except the last one in the file. Grid size is not
//! stored; it is recovered from the number of `newRow` markers and the length of a row.

use std::fs;
use std::io;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::{FromStr, Lines};

use serde::Serialize;
use stca_types::{Cell, Coord, Grid, GridError, SubcellState};
use stca_utils::atomic_write;
use thiserror::Error;
use tracing::{debug, info};

pub const EXTENSION: &str = "con";
const ROW_MARKER: &str = "newRow";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: unexpected end of file")]
    UnexpectedEof { line: usize },
    #[error("line {line}: unexpected blank line")]
    BlankLine { line: usize },
    #[error("line {line}: expected a number, found '{found}'")]
    InvalidNumber { line: usize, found: String },
    #[error("line {line}: state {value} is outside 0..{states}")]
    StateOutOfRange {
        line: usize,
        value: SubcellState,
        states: SubcellState,
    },
    #[error("line {line}: row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        line: usize,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("file contains no cells")]
    NoCells,
    #[error("annotation text must be a single line: {0:?}")]
    MultilineAnnotation(String),
    #[error("invalid configuration name '{0}' (letters, digits and spaces only)")]
    InvalidName(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A text label pinned to a position on the rendered grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

impl Annotation {
    #[must_use]
    pub fn new(text: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// A saved grid together with its annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub annotations: Vec<Annotation>,
    pub grid: Grid,
}

impl Configuration {
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            annotations: Vec::new(),
            grid,
        }
    }
}

pub fn render(config: &Configuration) -> Result<String, PersistError> {
    let mut out = String::new();
    out.push_str(&format!("{}\n", config.annotations.len()));
    for annotation in &config.annotations {
        if annotation.text.contains(['\n', '\r']) {
            return Err(PersistError::MultilineAnnotation(annotation.text.clone()));
        }
        out.push_str(&format!(
            "{}\n{}\n{}\n",
            annotation.text, annotation.x, annotation.y
        ));
    }

    let grid = &config.grid;
    let last_x = grid.width() - 1;
    let last_y = grid.height() - 1;
    for x in 0..grid.width() {
        for y in 0..grid.height() {
            let cell = grid.cell(Coord::new(x, y))?;
            let [top, bottom, left, right] = cell.subcells();
            out.push_str(&format!("{top}\n{bottom}\n{left}\n{right}"));
            if x != last_x || y != last_y {
                out.push('\n');
            }
        }
        if x != last_x {
            out.push_str(ROW_MARKER);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Line cursor with 1-based line numbers for error reporting.
struct LineCursor<'a> {
    inner: Peekable<Lines<'a>>,
    line: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().peekable(),
            line: 0,
        }
    }

    fn next_line(&mut self) -> Result<&'a str, PersistError> {
        let line = self
            .inner
            .next()
            .ok_or(PersistError::UnexpectedEof { line: self.line + 1 })?;
        self.line += 1;
        Ok(line)
    }

    fn next_number<T: FromStr>(&mut self) -> Result<T, PersistError> {
        let raw = self.next_line()?;
        if raw.trim().is_empty() {
            return Err(PersistError::BlankLine { line: self.line });
        }
        raw.trim().parse().map_err(|_| PersistError::InvalidNumber {
            line: self.line,
            found: raw.to_string(),
        })
    }

    fn next_state(&mut self, states: SubcellState) -> Result<SubcellState, PersistError> {
        let value: SubcellState = self.next_number()?;
        if value >= states {
            return Err(PersistError::StateOutOfRange {
                line: self.line,
                value,
                states,
            });
        }
        Ok(value)
    }

    /// True when only blank lines remain. Blank lines before more content are left in
    /// place so the next read reports them.
    fn at_end(&self) -> bool {
        self.inner.clone().all(|line| line.trim().is_empty())
    }
}

/// Parse a configuration, rejecting any state value `>= states`.
pub fn parse(text: &str, states: SubcellState) -> Result<Configuration, PersistError> {
    let mut lines = LineCursor::new(text);

    let count: usize = lines.next_number()?;
    let mut annotations = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let text = lines.next_line()?.to_string();
        let x = lines.next_number()?;
        let y = lines.next_number()?;
        annotations.push(Annotation { text, x, y });
    }

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new()];
    while !lines.at_end() {
        if lines.inner.peek().map(|line| line.trim()) == Some(ROW_MARKER) {
            lines.next_line()?;
            check_row(&rows, lines.line)?;
            rows.push(Vec::new());
            continue;
        }
        let cell = Cell::new(
            lines.next_state(states)?,
            lines.next_state(states)?,
            lines.next_state(states)?,
            lines.next_state(states)?,
        );
        if let Some(row) = rows.last_mut() {
            row.push(cell);
        }
    }
    if matches!(rows.as_slice(), [only] if only.is_empty()) {
        return Err(PersistError::NoCells);
    }
    check_row(&rows, lines.line)?;

    let width = rows.len();
    let height = rows.first().map_or(0, Vec::len);
    let cells = rows.into_iter().flatten().collect();
    let grid = Grid::from_cells(width, height, cells)?;
    debug!(width, height, annotations = annotations.len(), "parsed configuration");
    Ok(Configuration { annotations, grid })
}

/// The most recent row must be non-empty and as long as the first.
fn check_row(rows: &[Vec<Cell>], line: usize) -> Result<(), PersistError> {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Ok(());
    };
    if last.is_empty() || last.len() != first.len() {
        return Err(PersistError::RaggedRow {
            line,
            row: rows.len() - 1,
            expected: first.len(),
            actual: last.len(),
        });
    }
    Ok(())
}

pub fn save(path: &Path, config: &Configuration) -> Result<(), PersistError> {
    let text = render(config)?;
    atomic_write(path, text.as_bytes()).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "configuration saved");
    Ok(())
}

/// Read and parse a configuration file. Nothing is returned unless the whole file is valid.
pub fn load(path: &Path, states: SubcellState) -> Result<Configuration, PersistError> {
    let text = fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, states)
}

/// Path for a configuration named `name` in `dir`.
///
/// Names are limited to ASCII letters, digits and spaces.
pub fn config_path(dir: &Path, name: &str) -> Result<PathBuf, PersistError> {
    let valid = !name.trim().is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ');
    if !valid {
        return Err(PersistError::InvalidName(name.to_string()));
    }
    Ok(dir.join(format!("{name}.{EXTENSION}")))
}

/// Names (without extension) of the configurations saved in `dir`, sorted.
pub fn list_saved(dir: &Path) -> Result<Vec<String>, PersistError> {
    let read_err = |source: io::Error| PersistError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
