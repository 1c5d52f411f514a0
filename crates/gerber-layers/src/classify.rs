//! File-name and content classification for board fabrication files.
//!
//! Handles extension conventions from Altium/Protel, KiCad, Eagle and a
//! handful of fab-house exports. All comparisons are case-insensitive and
//! total: a miss classifies as `(Unknown, Unknown)` rather than failing.

use crate::types::{BoardFileType, BoardLayer, BoardSide};

/// Extensions that are never fabrication data; files carrying one are
/// ignored outright and never scheduled for parsing.
pub const BANNED_EXTENSIONS: &[&str] = &[
    "config", "exe", "dll", "png", "zip", "gif", "jpeg", "doc", "docx", "jpg", "bmp",
];

/// Substring rules for the generic `.gbr` extension (KiCad exports mostly).
/// First match wins.
const GBR_SUBSTRING_RULES: &[(&str, BoardSide, BoardLayer)] = &[
    ("outline", BoardSide::Both, BoardLayer::Outline),
    ("-edge_cuts", BoardSide::Both, BoardLayer::Outline),
    ("-b_cu", BoardSide::Bottom, BoardLayer::Copper),
    ("-f_cu", BoardSide::Top, BoardLayer::Copper),
    ("-b_silks", BoardSide::Bottom, BoardLayer::Silk),
    ("-f_silks", BoardSide::Top, BoardLayer::Silk),
    ("-b_mask", BoardSide::Bottom, BoardLayer::SolderMask),
    ("-f_mask", BoardSide::Top, BoardLayer::SolderMask),
    ("-b_paste", BoardSide::Bottom, BoardLayer::Paste),
    ("-f_paste", BoardSide::Top, BoardLayer::Paste),
];

/// Dotted-descriptor rules for the generic `.ger` extension (EasyEDA and
/// Protel-style exports). First match wins.
const GER_SUBSTRING_RULES: &[(&str, BoardSide, BoardLayer)] = &[
    (".topsoldermask", BoardSide::Top, BoardLayer::SolderMask),
    (".topsilkscreen", BoardSide::Top, BoardLayer::Silk),
    (".toplayer", BoardSide::Top, BoardLayer::Copper),
    (".tcream", BoardSide::Top, BoardLayer::Paste),
    (".boardoutline", BoardSide::Both, BoardLayer::Outline),
    (".bcream", BoardSide::Bottom, BoardLayer::Paste),
    (".bottomsoldermask", BoardSide::Bottom, BoardLayer::SolderMask),
    (".bottomsilkscreen", BoardSide::Bottom, BoardLayer::Silk),
    (".bottomlayer", BoardSide::Bottom, BoardLayer::Copper),
    (".internalplane1", BoardSide::Internal1, BoardLayer::Copper),
    (".internalplane2", BoardSide::Internal2, BoardLayer::Copper),
];

/// Exact base-name rules for `.gbr` files (Eagle CAM jobs name files
/// `top.gbr`, `boardoutline.gbr`, ...).
const GBR_BASENAME_RULES: &[(&str, BoardSide, BoardLayer)] = &[
    ("boardoutline", BoardSide::Both, BoardLayer::Outline),
    ("outline", BoardSide::Both, BoardLayer::Outline),
    ("board", BoardSide::Both, BoardLayer::Outline),
    ("bottom", BoardSide::Bottom, BoardLayer::Copper),
    ("bottommask", BoardSide::Bottom, BoardLayer::SolderMask),
    ("bottompaste", BoardSide::Bottom, BoardLayer::Paste),
    ("bottomsilk", BoardSide::Bottom, BoardLayer::Silk),
    ("top", BoardSide::Top, BoardLayer::Copper),
    ("topmask", BoardSide::Top, BoardLayer::SolderMask),
    ("toppaste", BoardSide::Top, BoardLayer::Paste),
    ("topsilk", BoardSide::Top, BoardLayer::Silk),
    ("inner1", BoardSide::Internal1, BoardLayer::Copper),
    ("inner2", BoardSide::Internal2, BoardLayer::Copper),
];

/// Strip any directory path, keeping just the final component.
fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit('/')
        .next()
        .unwrap_or(file_name)
        .rsplit('\\')
        .next()
        .unwrap_or(file_name)
}

fn extension(lower: &str) -> &str {
    lower.rsplit('.').next().unwrap_or(lower)
}

pub fn is_banned(file_name: &str) -> bool {
    let lower = base_name(file_name).to_lowercase();
    BANNED_EXTENSIONS.contains(&extension(&lower))
}

/// Map a file name to its board side and layer. Pure and total; returns
/// `(Unknown, Unknown)` when nothing matches.
pub fn side_and_layer(file_name: &str) -> (BoardSide, BoardLayer) {
    let name = base_name(file_name);
    let lower = name.to_lowercase();
    let ext = extension(&lower);

    match ext {
        "gbr" => {
            // Eagle-style exact base names first, then KiCad substrings.
            let stem = lower.split('.').next().unwrap_or(&lower);
            for (exact, side, layer) in GBR_BASENAME_RULES {
                if stem == *exact {
                    return (*side, *layer);
                }
            }
            for (needle, side, layer) in GBR_SUBSTRING_RULES {
                if lower.contains(needle) {
                    return (*side, *layer);
                }
            }
            (BoardSide::Unknown, BoardLayer::Unknown)
        }
        "ger" => {
            for (needle, side, layer) in GER_SUBSTRING_RULES {
                if lower.contains(needle) {
                    return (*side, *layer);
                }
            }
            (BoardSide::Unknown, BoardLayer::Unknown)
        }

        "gml" => (BoardSide::Both, BoardLayer::Mill),
        "fabrd" | "oln" | "gko" | "gb3" | "gt3" => (BoardSide::Both, BoardLayer::Outline),

        "l1" | "l1m" | "gtl" | "top" => (BoardSide::Top, BoardLayer::Copper),
        "l4" | "gbl" | "l2m" | "bottom" | "bot" => (BoardSide::Bottom, BoardLayer::Copper),
        "l2" | "gl1" | "g2l" => (BoardSide::Internal1, BoardLayer::Copper),
        "l3" | "gl2" | "g3l" => (BoardSide::Internal2, BoardLayer::Copper),

        "gts" | "sm1" | "smtop" | "smt" => (BoardSide::Top, BoardLayer::SolderMask),
        "gbs" | "sm2" | "smbottom" | "smb" => (BoardSide::Bottom, BoardLayer::SolderMask),

        "gto" | "ss1" | "sstop" | "slk" | "sst" => (BoardSide::Top, BoardLayer::Silk),
        "gbo" | "ss2" | "ssbottom" | "bsk" | "ssb" => (BoardSide::Bottom, BoardLayer::Silk),

        "gtp" | "sptop" | "spt" | "gpt" => (BoardSide::Top, BoardLayer::Paste),
        "gbp" | "spbottom" | "spb" | "gpb" => (BoardSide::Bottom, BoardLayer::Paste),

        "adtop" => (BoardSide::Top, BoardLayer::Assembly),
        "adbottom" => (BoardSide::Bottom, BoardLayer::Assembly),
        "notes" => (BoardSide::Both, BoardLayer::Notes),

        "drl" | "drill" | "drillnpt" | "drill_top_bottom" => {
            (BoardSide::Both, BoardLayer::Drill)
        }

        _ => {
            // Mechanical layers gm1..gm20.
            if let Some(num) = ext.strip_prefix("gm") {
                if matches!(num.parse::<u32>(), Ok(n) if (1..=20).contains(&n)) {
                    return (BoardSide::Both, BoardLayer::Mechanical);
                }
            }
            (BoardSide::Unknown, BoardLayer::Unknown)
        }
    }
}

/// Sniff the broad content category of a file. Banned extensions are
/// unsupported regardless of content; otherwise the characteristic header
/// tokens decide (`%FS` for Gerber format statements, `M48` for Excellon
/// drill headers).
pub fn file_type(file_name: &str, content: &str) -> BoardFileType {
    if is_banned(file_name) {
        return BoardFileType::Unsupported;
    }
    if content.contains("%FS") {
        return BoardFileType::Gerber;
    }
    if content.contains("M48") {
        return BoardFileType::Drill;
    }
    BoardFileType::Unsupported
}

/// Full classification of one file: name rules first, then the content
/// sniff for layers the name alone leaves ambiguous (generic drill
/// extensions mostly ship under names like `holes.txt`).
pub fn resolve(file_name: &str, content: &str) -> (BoardSide, BoardLayer, BoardFileType) {
    let (side, layer) = side_and_layer(file_name);
    let file_type = self::file_type(file_name, content);
    if layer == BoardLayer::Unknown && file_type == BoardFileType::Drill {
        return (BoardSide::Both, BoardLayer::Drill, file_type);
    }
    (side, layer, file_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn altium_extensions() {
        assert_eq!(
            side_and_layer("board.GTL"),
            (BoardSide::Top, BoardLayer::Copper)
        );
        assert_eq!(
            side_and_layer("board.GBL"),
            (BoardSide::Bottom, BoardLayer::Copper)
        );
        assert_eq!(
            side_and_layer("board.GTS"),
            (BoardSide::Top, BoardLayer::SolderMask)
        );
        assert_eq!(
            side_and_layer("board.GBS"),
            (BoardSide::Bottom, BoardLayer::SolderMask)
        );
        assert_eq!(
            side_and_layer("board.GTO"),
            (BoardSide::Top, BoardLayer::Silk)
        );
        assert_eq!(
            side_and_layer("board.GBO"),
            (BoardSide::Bottom, BoardLayer::Silk)
        );
        assert_eq!(
            side_and_layer("board.GKO"),
            (BoardSide::Both, BoardLayer::Outline)
        );
    }

    #[test]
    fn drill_extensions() {
        assert_eq!(
            side_and_layer("holes.drl"),
            (BoardSide::Both, BoardLayer::Drill)
        );
        assert_eq!(
            side_and_layer("holes.DRILL"),
            (BoardSide::Both, BoardLayer::Drill)
        );
    }

    #[test]
    fn mechanical_range() {
        assert_eq!(
            side_and_layer("board.gm1"),
            (BoardSide::Both, BoardLayer::Mechanical)
        );
        assert_eq!(
            side_and_layer("board.GM20"),
            (BoardSide::Both, BoardLayer::Mechanical)
        );
        assert_eq!(
            side_and_layer("board.gm21"),
            (BoardSide::Unknown, BoardLayer::Unknown)
        );
        assert_eq!(
            side_and_layer("board.gm0"),
            (BoardSide::Unknown, BoardLayer::Unknown)
        );
    }

    #[test]
    fn kicad_gbr_substrings() {
        assert_eq!(
            side_and_layer("proj-F_Cu.gbr"),
            (BoardSide::Top, BoardLayer::Copper)
        );
        assert_eq!(
            side_and_layer("proj-B_Mask.gbr"),
            (BoardSide::Bottom, BoardLayer::SolderMask)
        );
        assert_eq!(
            side_and_layer("proj-Edge_Cuts.gbr"),
            (BoardSide::Both, BoardLayer::Outline)
        );
    }

    #[test]
    fn gbr_exact_basenames() {
        assert_eq!(
            side_and_layer("Top.gbr"),
            (BoardSide::Top, BoardLayer::Copper)
        );
        assert_eq!(
            side_and_layer("BoardOutline.gbr"),
            (BoardSide::Both, BoardLayer::Outline)
        );
        assert_eq!(
            side_and_layer("inner2.gbr"),
            (BoardSide::Internal2, BoardLayer::Copper)
        );
    }

    #[test]
    fn ger_descriptors_first_match_wins() {
        assert_eq!(
            side_and_layer("proj.TopSolderMask.ger"),
            (BoardSide::Top, BoardLayer::SolderMask)
        );
        assert_eq!(
            side_and_layer("proj.BottomLayer.ger"),
            (BoardSide::Bottom, BoardLayer::Copper)
        );
        assert_eq!(
            side_and_layer("proj.InternalPlane1.ger"),
            (BoardSide::Internal1, BoardLayer::Copper)
        );
    }

    #[test]
    fn strips_directory_paths() {
        assert_eq!(
            side_and_layer("gerbers/board.GTL"),
            (BoardSide::Top, BoardLayer::Copper)
        );
        assert_eq!(
            side_and_layer("out\\copper\\board.gbl"),
            (BoardSide::Bottom, BoardLayer::Copper)
        );
    }

    #[test]
    fn total_on_garbage() {
        assert_eq!(
            side_and_layer("readme.txt"),
            (BoardSide::Unknown, BoardLayer::Unknown)
        );
        assert_eq!(
            side_and_layer(""),
            (BoardSide::Unknown, BoardLayer::Unknown)
        );
        assert_eq!(
            side_and_layer("no_extension"),
            (BoardSide::Unknown, BoardLayer::Unknown)
        );
    }

    #[test]
    fn sniff_gerber_and_drill() {
        assert_eq!(
            file_type("a.gbr", "%FSLAX34Y34*%"),
            BoardFileType::Gerber
        );
        assert_eq!(file_type("a.txt", "M48\nMETRIC\n"), BoardFileType::Drill);
        assert_eq!(file_type("a.txt", "hello"), BoardFileType::Unsupported);
    }

    #[test]
    fn sniff_rejects_banned_extensions() {
        assert_eq!(file_type("a.png", "%FS"), BoardFileType::Unsupported);
        assert!(is_banned("dir/archive.ZIP"));
        assert!(!is_banned("board.gtl"));
    }

    #[test]
    fn resolve_disambiguates_drill_by_content() {
        assert_eq!(
            resolve("holes.txt", "M48\nMETRIC\n"),
            (BoardSide::Both, BoardLayer::Drill, BoardFileType::Drill)
        );
        // A confidently named file keeps its name-based classification.
        assert_eq!(
            resolve("board.gtl", "%FSLAX34Y34*%"),
            (BoardSide::Top, BoardLayer::Copper, BoardFileType::Gerber)
        );
        assert_eq!(
            resolve("readme.md", "nothing to see"),
            (
                BoardSide::Unknown,
                BoardLayer::Unknown,
                BoardFileType::Unsupported
            )
        );
    }
}
