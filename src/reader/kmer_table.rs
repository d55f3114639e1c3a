use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{CustomError, Result};
use crate::model::{KmerInfo, Site};

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Reads a k-mer table (tab-separated, `#`-prefixed header, optionally gzipped).
pub fn read_kmer_infos(path: &impl AsRef<Path>) -> Result<Vec<KmerInfo>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: path.to_path_buf(),
    })?;
    let input: Box<dyn Read> = if is_gzipped(path) {
        Box::new(MultiGzDecoder::new(BufReader::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    parse_kmer_infos(input, path)
}

fn parse_kmer_infos(input: impl Read, path: &Path) -> Result<Vec<KmerInfo>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let found: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if idx == 0 {
                field.trim_start_matches('#').to_string()
            } else {
                field.to_string()
            }
        })
        .collect();
    if found != KmerInfo::HEADERS {
        return Err(CustomError::KmerTableHeader {
            path: path.to_path_buf(),
            found,
            expected: KmerInfo::HEADERS.iter().map(|h| h.to_string()).collect(),
        });
    }

    let mut kmer_infos = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line_num = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != KmerInfo::HEADERS.len() {
            return Err(CustomError::KmerTableFields {
                line_num,
                n_fields: record.len(),
                expected: KmerInfo::HEADERS.len(),
            });
        }
        let position = record[2]
            .parse::<u64>()
            .map_err(|e| CustomError::KmerTablePosition {
                source: e,
                line_num,
                value: record[2].to_string(),
            })?;
        let ref_kmer = &record[5];
        if ref_kmer.len() % 2 == 0 || !ref_kmer.is_ascii() {
            return Err(CustomError::KmerTableKmer {
                line_num,
                kmer: ref_kmer.to_string(),
            });
        }
        kmer_infos.push(KmerInfo {
            site: Site {
                genome_release: record[0].to_string(),
                chromosome: record[1].to_string(),
                position,
                reference: record[3].to_string(),
                alternative: record[4].to_string(),
            },
            ref_kmer: ref_kmer.to_string(),
        });
    }
    Ok(kmer_infos)
}

/// Writes a k-mer table, gzip-compressed when the path ends in `.gz`.
pub fn write_kmer_infos(kmer_infos: &[KmerInfo], path: &impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let to_err = |e| CustomError::Write {
        source: e,
        path: path.to_path_buf(),
    };
    let f = BufWriter::new(File::create(path).map_err(to_err)?);
    if is_gzipped(path) {
        let encoder = emit_kmer_infos(kmer_infos, GzEncoder::new(f, Compression::default()))?;
        encoder.finish().map_err(to_err)?.flush().map_err(to_err)?;
    } else {
        emit_kmer_infos(kmer_infos, f)?.flush().map_err(to_err)?;
    }
    Ok(())
}

fn emit_kmer_infos<W: Write>(kmer_infos: &[KmerInfo], output: W) -> Result<W> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(output);

    let mut header = KmerInfo::HEADERS.map(str::to_string);
    header[0].insert(0, '#');
    wtr.write_record(&header)?;
    for info in kmer_infos {
        let site = &info.site;
        let position = site.position.to_string();
        wtr.write_record([
            site.genome_release.as_str(),
            site.chromosome.as_str(),
            position.as_str(),
            site.reference.as_str(),
            site.alternative.as_str(),
            info.ref_kmer.as_str(),
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| CustomError::Csv(csv::Error::from(e.into_error())))
}
