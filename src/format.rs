//! Output rendering: raw counts, bedgraph, and wide dataframe formats.
//!
//! Grounded on the teacher's `streaming::output::BedWriter` (buffered writer
//! using `itoa`/`ryu` to avoid allocation in the hot formatting path),
//! generalized from BED3 lines to methylome level rows.

use std::fmt;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::levels::Level;

/// A resolved genomic region a column of levels is reported against:
/// `(chrom, start_bp, stop_bp)`.
pub type Region = (String, u64, u64);

/// The sentinel written for an uncovered bedgraph/score value (spec.md §4.4,
/// §9). Chosen over an empty field because it parses back unambiguously as
/// "not a number" rather than as a present-but-empty column.
pub const NA_SENTINEL: &str = "NA";

/// Output formats from spec.md §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Counts,
    Bedgraph,
    Dataframe,
    DataframeScores,
}

impl Serialize for OutputFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Counts => "counts",
            OutputFormat::Bedgraph => "bedgraph",
            OutputFormat::Dataframe => "dataframe",
            OutputFormat::DataframeScores => "dataframe_scores",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counts" => Ok(OutputFormat::Counts),
            "bedgraph" => Ok(OutputFormat::Bedgraph),
            "dataframe" => Ok(OutputFormat::Dataframe),
            "dataframe_scores" | "dfscores" => Ok(OutputFormat::DataframeScores),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Buffered, allocation-light writer for level rows.
pub struct LevelsWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> LevelsWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: BufWriter::new(output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    fn write_int<I: itoa::Integer>(&mut self, n: I) -> io::Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())
    }

    fn write_score(&mut self, score: Option<f64>) -> io::Result<()> {
        match score {
            Some(v) => self.writer.write_all(self.ryu_buf.format(v).as_bytes()),
            None => self.writer.write_all(NA_SENTINEL.as_bytes()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// `counts` format: one line per region, raw `(n_meth, n_unmeth[, n_covered])`
    /// per methylome, tab-separated.
    pub fn write_counts(
        &mut self,
        regions: &[Region],
        names: &[String],
        levels: &[Vec<Level>],
    ) -> io::Result<()> {
        for (row, (chrom, start, stop)) in regions.iter().enumerate() {
            self.writer.write_all(chrom.as_bytes())?;
            self.writer.write_all(b"\t")?;
            self.write_int(*start)?;
            self.writer.write_all(b"\t")?;
            self.write_int(*stop)?;
            for levels_for_name in levels {
                let level = levels_for_name[row];
                self.writer.write_all(b"\t")?;
                self.write_int(level.n_meth)?;
                self.writer.write_all(b",")?;
                self.write_int(level.n_unmeth)?;
                if let Some(covered) = level.n_covered {
                    self.writer.write_all(b",")?;
                    self.write_int(covered)?;
                }
            }
            let _ = names;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// `bedgraph` format: one `track` block per methylome, `chrom\tstart\tstop\tscore`
    /// lines, `NA` where `m + u = 0`.
    pub fn write_bedgraph(
        &mut self,
        regions: &[Region],
        names: &[String],
        levels: &[Vec<Level>],
    ) -> io::Result<()> {
        for (name, levels_for_name) in names.iter().zip(levels) {
            writeln!(self.writer, "track type=bedGraph name=\"{name}\"")?;
            for (row, (chrom, start, stop)) in regions.iter().enumerate() {
                self.writer.write_all(chrom.as_bytes())?;
                self.writer.write_all(b"\t")?;
                self.write_int(*start)?;
                self.writer.write_all(b"\t")?;
                self.write_int(*stop)?;
                self.writer.write_all(b"\t")?;
                self.write_score(levels_for_name[row].score())?;
                self.writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// `dataframe` format: wide table, `{name}_meth`/`{name}_unmeth` (and
    /// `{name}_covered` for the covered variant) columns per methylome.
    pub fn write_dataframe(
        &mut self,
        regions: &[Region],
        names: &[String],
        levels: &[Vec<Level>],
    ) -> io::Result<()> {
        let covered_variant = levels
            .first()
            .and_then(|row| row.first())
            .map(|l| l.is_covered_variant())
            .unwrap_or(false);

        self.writer.write_all(b"chrom\tstart\tstop")?;
        for name in names {
            write!(self.writer, "\t{name}_meth\t{name}_unmeth")?;
            if covered_variant {
                write!(self.writer, "\t{name}_covered")?;
            }
        }
        self.writer.write_all(b"\n")?;

        for (row, (chrom, start, stop)) in regions.iter().enumerate() {
            self.writer.write_all(chrom.as_bytes())?;
            self.writer.write_all(b"\t")?;
            self.write_int(*start)?;
            self.writer.write_all(b"\t")?;
            self.write_int(*stop)?;
            for levels_for_name in levels {
                let level = levels_for_name[row];
                self.writer.write_all(b"\t")?;
                self.write_int(level.n_meth)?;
                self.writer.write_all(b"\t")?;
                self.write_int(level.n_unmeth)?;
                if let Some(covered) = level.n_covered {
                    self.writer.write_all(b"\t")?;
                    self.write_int(covered)?;
                }
            }
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// `dataframe_scores` format: same shape as `dataframe` but one `{name}`
    /// score column per methylome, omitting raw counts.
    pub fn write_dataframe_scores(
        &mut self,
        regions: &[Region],
        names: &[String],
        levels: &[Vec<Level>],
    ) -> io::Result<()> {
        self.writer.write_all(b"chrom\tstart\tstop")?;
        for name in names {
            self.writer.write_all(b"\t")?;
            self.writer.write_all(name.as_bytes())?;
        }
        self.writer.write_all(b"\n")?;

        for (row, (chrom, start, stop)) in regions.iter().enumerate() {
            self.writer.write_all(chrom.as_bytes())?;
            self.writer.write_all(b"\t")?;
            self.write_int(*start)?;
            self.writer.write_all(b"\t")?;
            self.write_int(*stop)?;
            for levels_for_name in levels {
                self.writer.write_all(b"\t")?;
                self.write_score(levels_for_name[row].score())?;
            }
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Parse the `(chrom, start, stop, ratio)` tuples out of a `bedgraph` block,
/// ignoring `track` header lines. Used to verify the render round-trip
/// (spec.md §8).
pub fn parse_bedgraph(text: &str) -> Vec<(String, u64, u64, Option<f64>)> {
    let mut out = Vec::new();
    for line in text.lines() {
        if line.starts_with("track") || line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(chrom), Some(start), Some(stop), Some(score)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let start: u64 = start.parse().unwrap_or_default();
        let stop: u64 = stop.parse().unwrap_or_default();
        let score = if score == NA_SENTINEL {
            None
        } else {
            score.parse().ok()
        };
        out.push((chrom.to_string(), start, stop, score));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<Region>, Vec<String>, Vec<Vec<Level>>) {
        let regions = vec![
            ("chr1".to_string(), 0, 100),
            ("chr1".to_string(), 100, 200),
        ];
        let names = vec!["SRX012345".to_string()];
        let levels = vec![vec![
            Level { n_meth: 3, n_unmeth: 1, n_covered: None },
            Level { n_meth: 0, n_unmeth: 0, n_covered: None },
        ]];
        (regions, names, levels)
    }

    #[test]
    fn output_format_round_trips_through_display_and_from_str() {
        for fmt in [
            OutputFormat::Counts,
            OutputFormat::Bedgraph,
            OutputFormat::Dataframe,
            OutputFormat::DataframeScores,
        ] {
            let s = fmt.to_string();
            assert_eq!(OutputFormat::from_str(&s).unwrap(), fmt);
        }
    }

    #[test]
    fn counts_format_writes_raw_pairs() {
        let (regions, names, levels) = sample();
        let mut buf = Vec::new();
        {
            let mut w = LevelsWriter::new(&mut buf);
            w.write_counts(&regions, &names, &levels).unwrap();
            w.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "chr1\t0\t100\t3,1\nchr1\t100\t200\t0,0\n");
    }

    #[test]
    fn bedgraph_uses_na_sentinel_when_uncovered() {
        let (regions, names, levels) = sample();
        let mut buf = Vec::new();
        {
            let mut w = LevelsWriter::new(&mut buf);
            w.write_bedgraph(&regions, &names, &levels).unwrap();
            w.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("chr1\t0\t100\t0.75\n"));
        assert!(text.contains("chr1\t100\t200\tNA\n"));
    }

    #[test]
    fn bedgraph_round_trips_through_parse() {
        let (regions, names, levels) = sample();
        let mut buf = Vec::new();
        {
            let mut w = LevelsWriter::new(&mut buf);
            w.write_bedgraph(&regions, &names, &levels).unwrap();
            w.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let parsed = parse_bedgraph(&text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ("chr1".to_string(), 0, 100, Some(0.75)));
        assert_eq!(parsed[1], ("chr1".to_string(), 100, 200, None));
    }

    #[test]
    fn dataframe_scores_omits_raw_counts() {
        let (regions, names, levels) = sample();
        let mut buf = Vec::new();
        {
            let mut w = LevelsWriter::new(&mut buf);
            w.write_dataframe_scores(&regions, &names, &levels).unwrap();
            w.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("chrom\tstart\tstop\tSRX012345\n"));
        assert!(!text.contains("_meth"));
    }

    #[test]
    fn dataframe_includes_covered_column_for_covered_variant() {
        let regions = vec![("chr1".to_string(), 0, 100)];
        let names = vec!["SRX012345".to_string()];
        let levels = vec![vec![Level { n_meth: 1, n_unmeth: 1, n_covered: Some(2) }]];
        let mut buf = Vec::new();
        {
            let mut w = LevelsWriter::new(&mut buf);
            w.write_dataframe(&regions, &names, &levels).unwrap();
            w.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("chrom\tstart\tstop\tSRX012345_meth\tSRX012345_unmeth\tSRX012345_covered\n"));
    }
}
