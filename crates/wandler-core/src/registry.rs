// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format registry: which target formats each source format converts to.
//
// Document formats (PNG, JPG, PDF) convert among themselves; vector formats
// (GeoJSON, Shapefile) convert to each other. Nothing crosses over.

use crate::types::FormatTag;

/// Allowed targets for `source`, in menu order. The first entry is the
/// default selection.
pub fn allowed_targets(source: FormatTag) -> &'static [FormatTag] {
    match source {
        FormatTag::Pdf => &[FormatTag::Png, FormatTag::Jpg],
        FormatTag::Png => &[FormatTag::Jpg, FormatTag::Pdf],
        FormatTag::Jpg => &[FormatTag::Png, FormatTag::Pdf],
        FormatTag::GeoJson => &[FormatTag::Shp],
        FormatTag::Shp => &[FormatTag::GeoJson],
    }
}

/// Target to pre-select when the user picks `source`.
pub fn default_target(source: FormatTag) -> FormatTag {
    // Every entry in the table is non-empty.
    allowed_targets(source)[0]
}

/// Whether a request from `source` to `target` can be dispatched.
/// Identity pairs are accepted and handled as a plain copy.
pub fn is_supported(source: FormatTag, target: FormatTag) -> bool {
    source == target || allowed_targets(source).contains(&target)
}

/// Source formats in menu order.
pub fn source_formats() -> &'static [FormatTag] {
    &FormatTag::ALL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_has_targets() {
        for tag in FormatTag::ALL {
            assert!(!allowed_targets(tag).is_empty(), "{tag} has no targets");
        }
    }

    #[test]
    fn targets_never_include_source() {
        for tag in FormatTag::ALL {
            assert!(!allowed_targets(tag).contains(&tag));
        }
    }

    #[test]
    fn families_are_closed() {
        for source in FormatTag::ALL {
            for target in allowed_targets(source) {
                assert_eq!(source.family(), target.family());
            }
        }
    }

    #[test]
    fn document_group_is_fully_connected() {
        let group = [FormatTag::Png, FormatTag::Jpg, FormatTag::Pdf];
        for source in group {
            for target in group {
                if source != target {
                    assert!(is_supported(source, target), "{source} -> {target}");
                }
            }
        }
    }

    #[test]
    fn defaults_follow_table_order() {
        assert_eq!(default_target(FormatTag::Pdf), FormatTag::Png);
        assert_eq!(default_target(FormatTag::Png), FormatTag::Jpg);
        assert_eq!(default_target(FormatTag::Jpg), FormatTag::Png);
        assert_eq!(default_target(FormatTag::GeoJson), FormatTag::Shp);
        assert_eq!(default_target(FormatTag::Shp), FormatTag::GeoJson);
    }

    #[test]
    fn cross_family_is_unsupported() {
        assert!(!is_supported(FormatTag::Pdf, FormatTag::GeoJson));
        assert!(!is_supported(FormatTag::Shp, FormatTag::Png));
        assert!(is_supported(FormatTag::Shp, FormatTag::Shp));
    }
}
