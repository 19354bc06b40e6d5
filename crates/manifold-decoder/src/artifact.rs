// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Parametrisation Artifact
// ─────────────────────────────────────────────────────────────────────
//! Plain-text persistence of a fitted embedding:
//!
//! ```text
//! #scalar f64
//! <N> <N>
//! <N lines of N inverse-kernel values>
//! #latent
//! <N>
//! <L>
//! <identifier> <x_1> ... <x_L>      (N lines)
//! ```
//!
//! Values are written in Rust's shortest round-trip notation, so a
//! save/load cycle is lossless. Blank lines are ignored on read.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use manifold_types::{KernelParams, ManifoldError, ManifoldResult, OptimisationResult};

use crate::reconstruct::LatentModel;

pub const SCALAR_TAG: &str = "#scalar f64";
pub const LATENT_HEADER: &str = "#latent";

/// Contents of a parametrisation file.
#[derive(Debug, Clone, PartialEq)]
pub struct Parametrisation {
    pub identifiers: Vec<String>,
    /// N×N row-major.
    pub inverse_kernel: Vec<f64>,
    /// N·L.
    pub latent: Vec<f64>,
    pub sample_count: usize,
    pub latent_dim: usize,
}

impl Parametrisation {
    pub fn latent_coordinate(&self, index: usize) -> Option<&[f64]> {
        if index >= self.sample_count {
            return None;
        }
        let l = self.latent_dim;
        self.latent.get(index * l..(index + 1) * l)
    }

    /// Index of the sample called `identifier`.
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.identifiers.iter().position(|id| id == identifier)
    }

    /// Decoder model; the file carries neither the mean nor the kernel
    /// constants, so the caller supplies them.
    pub fn into_model(self, mean: Vec<f64>, kernel: KernelParams) -> ManifoldResult<LatentModel> {
        LatentModel::new(self.inverse_kernel, self.latent, mean, self.latent_dim, kernel)
    }
}

fn check_identifiers<S: AsRef<str>>(identifiers: &[S], n: usize) -> ManifoldResult<()> {
    if identifiers.len() != n {
        return Err(ManifoldError::Validation(format!(
            "{} identifiers for {n} samples",
            identifiers.len()
        )));
    }
    for (i, id) in identifiers.iter().enumerate() {
        let id = id.as_ref();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(ManifoldError::Validation(format!(
                "identifier {i} ({id:?}) must be non-empty and free of whitespace"
            )));
        }
    }
    Ok(())
}

/// Write `result` with one identifier per sample.
pub fn write_parametrisation<W: Write, S: AsRef<str>>(
    mut writer: W,
    result: &OptimisationResult,
    identifiers: &[S],
) -> ManifoldResult<()> {
    let n = result.sample_count;
    let l = result.latent_dim;
    check_identifiers(identifiers, n)?;
    if result.inverse_kernel.len() != n * n || result.latent.len() != n * l {
        return Err(ManifoldError::Validation(format!(
            "result shapes do not match N={n}, L={l}"
        )));
    }

    writeln!(writer, "{SCALAR_TAG}")?;
    writeln!(writer, "{n} {n}")?;
    for row in result.inverse_kernel.chunks(n) {
        write_values(&mut writer, row)?;
    }
    writeln!(writer, "{LATENT_HEADER}")?;
    writeln!(writer, "{n}")?;
    writeln!(writer, "{l}")?;
    for (id, coord) in identifiers.iter().zip(result.latent.chunks(l)) {
        write!(writer, "{} ", id.as_ref())?;
        write_values(&mut writer, coord)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_values<W: Write>(writer: &mut W, values: &[f64]) -> ManifoldResult<()> {
    for (k, v) in values.iter().enumerate() {
        if k > 0 {
            writer.write_all(b" ")?;
        }
        write!(writer, "{v:?}")?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn save_parametrisation<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    result: &OptimisationResult,
    identifiers: &[S],
) -> ManifoldResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_parametrisation(BufWriter::new(file), result, identifiers)?;
    log::info!(
        "Saved parametrisation of {} samples to {}",
        result.sample_count,
        path.display()
    );
    Ok(())
}

// ── Reading ───────────────────────────────────────────────────────────

/// Non-blank lines with 1-based numbers.
struct Lines<R> {
    inner: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            inner: reader.lines(),
            line: 0,
        }
    }

    fn next_line(&mut self, expected: &str) -> ManifoldResult<(usize, String)> {
        loop {
            match self.inner.next() {
                Some(text) => {
                    self.line += 1;
                    let text = text?;
                    if !text.trim().is_empty() {
                        return Ok((self.line, text));
                    }
                }
                None => {
                    return Err(format_error(
                        self.line + 1,
                        format!("unexpected end of file, expected {expected}"),
                    ))
                }
            }
        }
    }

    fn next_count(&mut self, expected: &str) -> ManifoldResult<usize> {
        let (line, text) = self.next_line(expected)?;
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens.as_slice() {
            [token] => parse_count(token, line),
            _ => Err(format_error(line, format!("expected {expected}"))),
        }
    }

    fn has_more(&mut self) -> ManifoldResult<Option<usize>> {
        for text in self.inner.by_ref() {
            self.line += 1;
            if !text?.trim().is_empty() {
                return Ok(Some(self.line));
            }
        }
        Ok(None)
    }
}

fn format_error(line: usize, message: impl Into<String>) -> ManifoldError {
    ManifoldError::Format {
        line,
        message: message.into(),
    }
}

fn parse_count(token: &str, line: usize) -> ManifoldResult<usize> {
    token
        .parse::<usize>()
        .map_err(|e| format_error(line, format!("invalid count {token:?}: {e}")))
}

fn parse_values<'a>(
    tokens: impl Iterator<Item = &'a str>,
    expected: usize,
    line: usize,
    out: &mut Vec<f64>,
) -> ManifoldResult<()> {
    let mut found = 0;
    for token in tokens {
        let v = token
            .parse::<f64>()
            .map_err(|e| format_error(line, format!("invalid value {token:?}: {e}")))?;
        out.push(v);
        found += 1;
    }
    if found != expected {
        return Err(format_error(
            line,
            format!("expected {expected} values, found {found}"),
        ));
    }
    Ok(())
}

pub fn read_parametrisation<R: BufRead>(reader: R) -> ManifoldResult<Parametrisation> {
    let mut lines = Lines::new(reader);

    let (line, tag) = lines.next_line("scalar tag")?;
    if !tag.trim_start().starts_with("#scalar") {
        return Err(format_error(line, format!("expected {SCALAR_TAG:?}, found {tag:?}")));
    }

    let (line, dims) = lines.next_line("inverse kernel dimensions")?;
    let n = match dims.split_whitespace().collect::<Vec<_>>().as_slice() {
        [rows, cols] => {
            let rows = parse_count(rows, line)?;
            let cols = parse_count(cols, line)?;
            if rows != cols || rows == 0 {
                return Err(format_error(
                    line,
                    format!("inverse kernel must be square and non-empty, got {rows}x{cols}"),
                ));
            }
            rows
        }
        _ => return Err(format_error(line, "expected \"<rows> <cols>\"")),
    };

    let mut inverse_kernel = Vec::with_capacity(n * n);
    for _ in 0..n {
        let (line, text) = lines.next_line("inverse kernel row")?;
        parse_values(text.split_whitespace(), n, line, &mut inverse_kernel)?;
    }

    let (line, header) = lines.next_line(LATENT_HEADER)?;
    if header.trim() != LATENT_HEADER {
        return Err(format_error(line, format!("expected {LATENT_HEADER:?}, found {header:?}")));
    }
    let count = lines.next_count("sample count")?;
    if count != n {
        return Err(format_error(
            lines.line,
            format!("{count} latent samples for a {n}x{n} inverse kernel"),
        ));
    }
    let latent_dim = lines.next_count("latent dimension")?;
    if latent_dim == 0 {
        return Err(format_error(lines.line, "latent dimension must be >= 1"));
    }

    let mut identifiers = Vec::with_capacity(n);
    let mut latent = Vec::with_capacity(n * latent_dim);
    for _ in 0..n {
        let (line, text) = lines.next_line("latent coordinate")?;
        let mut tokens = text.split_whitespace();
        let id = tokens
            .next()
            .ok_or_else(|| format_error(line, "missing identifier"))?;
        identifiers.push(id.to_string());
        parse_values(tokens, latent_dim, line, &mut latent)?;
    }

    if let Some(line) = lines.has_more()? {
        return Err(format_error(line, "trailing content after the last sample"));
    }

    Ok(Parametrisation {
        identifiers,
        inverse_kernel,
        latent,
        sample_count: n,
        latent_dim,
    })
}

pub fn load_parametrisation<P: AsRef<Path>>(path: P) -> ManifoldResult<Parametrisation> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let param = read_parametrisation(BufReader::new(file))?;
    log::debug!(
        "Loaded parametrisation of {} samples (L = {}) from {}",
        param.sample_count,
        param.latent_dim,
        path.display()
    );
    Ok(param)
}
