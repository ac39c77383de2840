//! Decode command implementation - project an alignment string onto coordinates

use annox_core::{is_perfect, string_to_blocks, AlignBlock, AlignFormat, AlignFrame, Span, Strand};
use serde::Serialize;

use crate::config::Config;
use crate::error::CliResult;

#[derive(Debug, Serialize)]
struct Decoded {
    format: AlignFormat,
    blocks: Vec<AlignBlock>,
    perfect: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    align: String,
    format: Option<AlignFormat>,
    ref_span: Span,
    ref_strand: Strand,
    match_span: Span,
    match_strand: Strand,
    align_error: Option<u32>,
    json: bool,
) -> CliResult<()> {
    let format = format.unwrap_or(config.align.format);
    let align_error = align_error.unwrap_or(config.align.align_error);
    log::info!("Decoding {} string against reference {}", format, ref_span);

    let frame = AlignFrame::new(ref_strand, ref_span, match_strand, match_span);
    let blocks = string_to_blocks(&align, format, &frame)?;
    let perfect = is_perfect(&blocks, align_error);
    log::info!("{} blocks, perfect: {}", blocks.len(), perfect);

    let decoded = Decoded {
        format,
        blocks,
        perfect,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        print!("{}", render_table(&decoded));
    }
    Ok(())
}

fn render_table(decoded: &Decoded) -> String {
    let mut out = String::from("t1\tt2\tq1\tq2\tstart\tend\n");
    for block in &decoded.blocks {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{:?}\t{:?}\n",
            block.t1, block.t2, block.q1, block.q2, block.start_boundary, block.end_boundary
        ));
    }
    out.push_str(&format!("perfect\t{}\n", decoded.perfect));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_blocks() {
        let frame = AlignFrame::new(Strand::Forward, Span::new(100, 116), Strand::Forward, Span::new(1, 15));
        let blocks = string_to_blocks("10M2D5M", AlignFormat::BamCigar, &frame).unwrap();
        let table = render_table(&Decoded {
            format: AlignFormat::BamCigar,
            perfect: is_perfect(&blocks, 0),
            blocks,
        });
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("100\t109\t1\t10\tEdge\tDeletion"));
        assert!(lines[2].starts_with("112\t116\t11\t15\tDeletion\tEdge"));
        assert_eq!(lines[3], "perfect\ttrue");
    }
}
