//! Build and query entry points used by the spell checker front end.

use crate::codec;
use crate::errors::{CcbfError, Result};
use crate::filter::Bloom;
use crate::params;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCheck {
    pub word: String,
    pub present: bool,
}

/// Summary of a file build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub path: PathBuf,
    pub words: usize,
    pub hash_count: u32,
    pub bit_count: u32,
    /// expected rate at the design load
    pub expected_fpr: f64,
}

/// One word per line. Trailing `\r` is dropped and blank lines are skipped.
pub fn read_words<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut words = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let word = line.trim_end_matches('\r');
        if !word.is_empty() {
            words.push(word.to_string());
        }
    }
    Ok(words)
}

/// Size a filter to `words`, insert them all and serialize it to `sink`.
pub fn build_filter<I, S, W>(words: I, sink: &mut W, false_positive_rate: f64) -> Result<Bloom>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    W: Write,
{
    let words: Vec<S> = words.into_iter().collect();
    if words.is_empty() {
        warn!("word list is empty");
    }
    let mut bloom = Bloom::with_rate(words.len(), false_positive_rate)?;
    for w in &words {
        bloom.insert(w.as_ref().as_bytes());
    }
    codec::write_to(&bloom, sink)?;
    sink.flush()?;
    Ok(bloom)
}

pub fn load_filter<R: Read>(source: &mut R) -> Result<Bloom> {
    codec::read_from(source)
}

pub fn check_words<I, S>(filter: &Bloom, words: I) -> Vec<WordCheck>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| {
            let word = w.as_ref();
            WordCheck { word: word.to_string(), present: filter.contains(word.as_bytes()) }
        })
        .collect()
}

/// Build from a line-delimited word file and atomically publish the filter at `out_path`.
pub fn build_filter_file(words_path: impl AsRef<Path>, out_path: impl AsRef<Path>, false_positive_rate: f64) -> Result<BuildReport> {
    let words_path = words_path.as_ref();
    let words = read_words(BufReader::new(File::open(words_path)?))?;
    if words.is_empty() {
        return Err(CcbfError::InvalidParameter(format!("{} contains no words", words_path.display())));
    }

    let (bloom, path) = codec::publish_atomic(out_path, |w| build_filter(&words, w, false_positive_rate))?;
    info!(words = words.len(), path = %path.display(), "built filter");

    Ok(BuildReport {
        path,
        words: words.len(),
        hash_count: bloom.hash_count(),
        bit_count: bloom.bit_count(),
        expected_fpr: params::false_positive_rate(bloom.bit_count(), words.len(), bloom.hash_count()),
    })
}

pub fn load_filter_file(path: impl AsRef<Path>) -> Result<Bloom> {
    codec::open(path)
}
