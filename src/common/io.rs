//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path);
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {:?} for reading: {}", path, e))?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path);
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {:?} for reading: {}", path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path);
        let file = File::create(path)
            .map_err(|e| anyhow::anyhow!("could not open {:?} for writing: {}", path, e))?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path);
        let file = File::create(path)
            .map_err(|e| anyhow::anyhow!("could not open {:?} for writing: {}", path, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Construct a tab-separated `csv::Reader` for a dump file with header.
pub fn tsv_reader<P>(path: P) -> Result<csv::Reader<Box<dyn BufRead>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quoting(false)
        .flexible(false)
        .from_reader(open_read_maybe_gz(path)?))
}

#[cfg(test)]
mod test {
    use std::io::{BufRead, Write};

    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("test.txt")]
    #[case("test.txt.gz")]
    fn write_then_read_maybe_gz(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();

        {
            let mut f = super::open_write_maybe_gz(tmp_dir.join(filename))?;
            writeln!(f, "first")?;
            writeln!(f, "second")?;
            f.flush()?;
        }

        let lines = super::open_read_maybe_gz(tmp_dir.join(filename))?
            .lines()
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(lines, vec!["first", "second"]);

        Ok(())
    }

    #[test]
    fn open_read_missing_file() {
        let res = super::open_read_maybe_gz("tests/does/not/exist.tsv");
        assert!(res.is_err());
    }
}
