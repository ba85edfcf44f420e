//! Line-oriented bulk note input: `front<TAB>back` or `front;back`.

/// One parsed front/back pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPair {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkParse {
    pub pairs: Vec<BulkPair>,
    /// Non-blank, non-comment lines that could not be used.
    pub skipped: usize,
}

/// Parse pasted lines. Blank lines and `#` comments are ignored. A tab is
/// preferred as delimiter (Anki text export), `;` otherwise; only the first
/// delimiter splits. Lines without a delimiter or with an empty side count as
/// skipped.
pub fn parse_bulk_lines(text: &str) -> BulkParse {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = BulkParse::default();

    for line in normalized.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let delim = if line.contains('\t') {
            '\t'
        } else if line.contains(';') {
            ';'
        } else {
            out.skipped += 1;
            continue;
        };

        let Some((front, back)) = line.split_once(delim) else {
            out.skipped += 1;
            continue;
        };
        let (front, back) = (front.trim(), back.trim());
        if front.is_empty() || back.is_empty() {
            out.skipped += 1;
            continue;
        }
        out.pairs.push(BulkPair {
            front: front.to_string(),
            back: back.to_string(),
        });
    }

    out
}
