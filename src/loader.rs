//! Minimal text-format loaders for the three tab-delimited record formats
//! the engine is fed from. Kept intentionally small: parsing, not a
//! dataset toolkit, no CLI, no stats printing.

use csv::{ReaderBuilder, StringRecord};

use crate::error::{RecomfError, Result};
use crate::index::{ItemId, PreferenceIndex};
use crate::neighbors::ItemNeighborhoods;
use crate::similarity::PairwiseSimilarity;

fn line_of(record: &StringRecord, fallback: usize) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(fallback)
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Preference file: one `user<TAB>item` per line; blank lines and `#`
/// comments ignored.
pub fn load_preferences(text: &str) -> Result<PreferenceIndex> {
    let mut index = PreferenceIndex::new();
    for (row, result) in reader(text).records().enumerate() {
        let record = result.map_err(|e| RecomfError::malformed(row + 1, e.to_string()))?;
        let line = line_of(&record, row + 1);
        if record.len() != 2 {
            return Err(RecomfError::malformed(
                line,
                format!("expected 2 fields, found {}", record.len()),
            ));
        }
        let user = &record[0];
        let item = &record[1];
        crate::index::require_nonempty_field(line, user, "user")?;
        crate::index::require_nonempty_field(line, item, "item")?;
        index.add(user, item);
    }
    Ok(index)
}

/// Similarity file: `itemA<TAB>itemB<TAB>score`, ids resolved through an
/// already-built `PreferenceIndex` so similarity ids line up with the
/// training ids. NaN scores are dropped; unknown item names are a
/// `MalformedInput` error since a similarity file is expected to
/// reference only items already present in the preference data.
pub fn load_similarity(text: &str, index: &PreferenceIndex) -> Result<PairwiseSimilarity> {
    use crate::index::PreferenceData;

    let mut sim = PairwiseSimilarity::new();
    for (row, result) in reader(text).records().enumerate() {
        let record = result.map_err(|e| RecomfError::malformed(row + 1, e.to_string()))?;
        let line = line_of(&record, row + 1);
        if record.len() != 3 {
            return Err(RecomfError::malformed(
                line,
                format!("expected 3 fields, found {}", record.len()),
            ));
        }
        let a_name = &record[0];
        let b_name = &record[1];
        let score_str = &record[2];

        let a = index
            .item_id(a_name)
            .ok_or_else(|| RecomfError::malformed(line, format!("unknown item '{}'", a_name)))?;
        let b = index
            .item_id(b_name)
            .ok_or_else(|| RecomfError::malformed(line, format!("unknown item '{}'", b_name)))?;
        let score: f32 = score_str
            .trim()
            .parse()
            .map_err(|_| RecomfError::malformed(line, format!("invalid score '{}'", score_str)))?;

        sim.insert(a, b, score);
    }
    Ok(sim)
}

/// Neighborhood file: same three-column format, interpreted as a directed
/// edge `source -> neighbor` into a bounded-size top-N list.
/// `max_neighbors = 0` means unbounded. Set `normalize` to L1-normalize
/// each per-source list after loading.
pub fn load_neighborhoods(
    text: &str,
    index: &PreferenceIndex,
    max_neighbors: usize,
    normalize: bool,
) -> Result<ItemNeighborhoods> {
    use crate::index::PreferenceData;

    let mut neigh = ItemNeighborhoods::new(max_neighbors);
    for (row, result) in reader(text).records().enumerate() {
        let record = result.map_err(|e| RecomfError::malformed(row + 1, e.to_string()))?;
        let line = line_of(&record, row + 1);
        if record.len() != 3 {
            return Err(RecomfError::malformed(
                line,
                format!("expected 3 fields, found {}", record.len()),
            ));
        }
        let source_name = &record[0];
        let neighbor_name = &record[1];
        let score_str = &record[2];

        let source: ItemId = index
            .item_id(source_name)
            .ok_or_else(|| RecomfError::malformed(line, format!("unknown item '{}'", source_name)))?;
        let neighbor: ItemId = index
            .item_id(neighbor_name)
            .ok_or_else(|| RecomfError::malformed(line, format!("unknown item '{}'", neighbor_name)))?;
        let score: f32 = score_str
            .trim()
            .parse()
            .map_err(|_| RecomfError::malformed(line, format!("invalid score '{}'", score_str)))?;

        neigh.add_edge(source, neighbor, score);
    }
    if normalize {
        neigh.normalize();
    }
    Ok(neigh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PreferenceData;

    #[test]
    fn loads_preferences_and_skips_comments() {
        let text = "# header\nu1\ti1\n\nu1\ti2\nu2\ti1\n";
        let index = load_preferences(text).unwrap();
        assert_eq!(index.size(), 3);
        assert!(index.contains_user("u1"));
    }

    #[test]
    fn rejects_malformed_preference_row() {
        let text = "u1\n";
        let err = load_preferences(text).unwrap_err();
        assert!(matches!(err, RecomfError::MalformedInput { line: 1, .. }));
    }

    #[test]
    fn loads_similarity_symmetrically() {
        let index = load_preferences("u1\ts1\nu1\tt1\n").unwrap();
        let sim = load_similarity("s1\tt1\t0.75\n", &index).unwrap();
        let s1 = index.item_id("s1").unwrap();
        let t1 = index.item_id("t1").unwrap();
        assert_eq!(sim.sim(s1, t1), sim.sim(t1, s1));
    }

    #[test]
    fn loads_neighborhoods_with_normalization() {
        let index = load_preferences("u1\tt1\nu1\ts1\nu1\ts2\n").unwrap();
        let t1 = index.item_id("t1").unwrap();
        let neigh = load_neighborhoods("t1\ts1\t1.0\nt1\ts2\t3.0\n", &index, 10, true).unwrap();
        let sum: f32 = neigh.neighbors(t1).unwrap().iter().map(|(_, s)| s).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_item_in_similarity_file_is_malformed() {
        let index = load_preferences("u1\ts1\n").unwrap();
        let err = load_similarity("s1\tghost\t0.5\n", &index).unwrap_err();
        assert!(matches!(err, RecomfError::MalformedInput { .. }));
    }
}
