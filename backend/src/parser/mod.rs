//! Delimited text to grid parser, with encoding and delimiter detection.
//!
//! The default [`QuoteMode::Toggle`] reproduces the behavior courier exports
//! have always been processed with: a `"` flips an "inside quotes" flag and is
//! never kept, so a doubled `""` is NOT an escaped quote. Lines are split on
//! `\n` before quotes are considered, so quoted newlines are not supported
//! either. [`QuoteMode::Rfc4180`] is an opt-in upgrade backed by the `csv`
//! crate; switching to it changes output for inputs containing quotes.

use crate::error::{CsvError, CsvResult};
use crate::models::{Cell, Grid, Row};

/// How `"` is interpreted while splitting cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteMode {
    /// `"` toggles quoting and is dropped; no escape sequence exists.
    #[default]
    Toggle,
    /// Standard quoting: `""` inside a quoted field is a literal quote and
    /// quoted fields may span lines.
    Rfc4180,
}

/// Parse text into a grid with toggle quoting.
///
/// # Example
/// ```
/// use parceldesk::parse_grid;
///
/// let grid = parse_grid("a,\"b,c\"\n1,2", ',');
/// assert_eq!(grid, vec![vec!["a", "b,c"], vec!["1", "2"]]);
/// ```
pub fn parse_grid(text: &str, delimiter: char) -> Grid {
    text.split('\n')
        .map(|line| parse_line(line, delimiter))
        .collect()
}

/// Parse text into a grid using the given quote mode.
pub fn parse_grid_with(text: &str, delimiter: char, mode: QuoteMode) -> CsvResult<Grid> {
    match mode {
        QuoteMode::Toggle => Ok(parse_grid(text, delimiter)),
        QuoteMode::Rfc4180 => parse_rfc4180(text, delimiter),
    }
}

fn parse_line(line: &str, delimiter: char) -> Row {
    let mut cells: Row = Vec::new();
    let mut cell = Cell::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            cells.push(std::mem::take(&mut cell));
        } else {
            cell.push(ch);
        }
    }
    // An open quote at end of line is accepted as-is.
    cells.push(cell);
    cells
}

fn parse_rfc4180(text: &str, delimiter: char) -> CsvResult<Grid> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError(format!("delimiter '{}' is not ASCII", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());

    let mut grid = Grid::new();
    for record in reader.records() {
        let record = record.map_err(|e| CsvError::ParseError(e.to_string()))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

/// Detect the encoding of raw bytes. Valid UTF-8 is taken as UTF-8;
/// chardet is consulted only for everything else.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(UTF8_BOM) || std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "shift_jis" | "shift-jis" | "sjis" | "cp932" | "windows-31j" => "shift_jis".to_string(),
        "euc-jp" => "euc-jp".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode bytes using the specified encoding. A leading UTF-8 BOM is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let encoding = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            return Ok(String::from_utf8(body.to_vec())
                .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned()));
        }
        "shift_jis" | "sjis" => encoding_rs::SHIFT_JIS,
        "euc-jp" => encoding_rs::EUC_JP,
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        other => encoding_rs::Encoding::for_label(other.as_bytes())
            .ok_or_else(|| CsvError::EncodingError(format!("unsupported encoding '{}'", other)))?,
    };

    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Detect the encoding and decode in one step. Falls back to lossy UTF-8 when
/// chardet names an encoding encoding_rs does not know.
pub fn decode_text(bytes: &[u8]) -> CsvResult<String> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return Ok(text.to_string());
    }

    let encoding = detect_encoding(bytes);
    match decode_content(bytes, &encoding) {
        Err(CsvError::EncodingError(_)) => decode_content(bytes, "utf-8"),
        other => other,
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_simple_grid() {
        let grid = parse_grid("a,b,c\n1,2,3", ',');
        assert_eq!(grid, vec![row(&["a", "b", "c"]), row(&["1", "2", "3"])]);
    }

    #[test]
    fn test_quoted_delimiter_kept() {
        let grid = parse_grid("\"Tokyo, Minato\",x", ',');
        assert_eq!(grid, vec![row(&["Tokyo, Minato", "x"])]);
    }

    #[test]
    fn test_doubled_quote_is_not_an_escape() {
        // Each quote toggles; nothing survives.
        let grid = parse_grid("\"say \"\"hi\"\"\",z", ',');
        assert_eq!(grid, vec![row(&["say hi", "z"])]);
    }

    #[test]
    fn test_unterminated_quote_ends_at_line_end() {
        let grid = parse_grid("\"open,still open\nnext,row", ',');
        assert_eq!(grid, vec![row(&["open,still open"]), row(&["next", "row"])]);
    }

    #[test]
    fn test_trailing_blank_lines_kept() {
        let grid = parse_grid("a,b\n\n", ',');
        assert_eq!(grid, vec![row(&["a", "b"]), row(&[""]), row(&[""])]);
    }

    #[test]
    fn test_empty_cells_and_input() {
        assert_eq!(parse_grid(",,", ','), vec![row(&["", "", ""])]);
        assert_eq!(parse_grid("", ','), vec![row(&[""])]);
    }

    #[test]
    fn test_carriage_return_stays_in_cell() {
        let grid = parse_grid("a,b\r\nc,d", ',');
        assert_eq!(grid[0], row(&["a", "b\r"]));
    }

    #[test]
    fn test_other_delimiter() {
        let grid = parse_grid("a;b,c", ';');
        assert_eq!(grid, vec![row(&["a", "b,c"])]);
    }

    #[test]
    fn test_rfc4180_mode_unescapes_quotes_and_newlines() {
        let grid = parse_grid_with("\"a\"\"b\",\"line1\nline2\"\nx,y", ',', QuoteMode::Rfc4180).unwrap();
        assert_eq!(grid, vec![row(&["a\"b", "line1\nline2"]), row(&["x", "y"])]);
    }

    #[test]
    fn test_rfc4180_rejects_non_ascii_delimiter() {
        assert!(parse_grid_with("a", '、', QuoteMode::Rfc4180).is_err());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_bom_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("お届け先,b".as_bytes());
        assert_eq!(decode_text(&bytes).unwrap(), "お届け先,b");
    }

    #[test]
    fn test_utf8_with_accents_kept() {
        let text = "a,b,c\n1,2,Café\n3,4,Société Générale\n";
        assert_eq!(detect_encoding(text.as_bytes()), "utf-8");
        assert_eq!(decode_text(text.as_bytes()).unwrap(), text);
    }

    #[test]
    fn test_shift_jis_decoding() {
        let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode("荷送人名");
        let decoded = decode_content(&encoded, "shift_jis").unwrap();
        assert_eq!(decoded, "荷送人名");
    }

    #[test]
    fn test_latin1_decoding() {
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        assert!(decode_content(b"abc", "klingon-8").is_err());
    }
}
