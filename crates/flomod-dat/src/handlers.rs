//! Built-in record handlers for the canonical fixed-format layouts.
//!
//! Each handler is a byte-exact inverse pair: `format(parse(block)) == block`
//! for well-formed blocks. Segments the model does not interpret (titles,
//! spill lines, row tails, unknown records) are carried verbatim.

use crate::error::{Error, Result};
use crate::registry::{RecordHandler, is_keyword};
use crate::unit::{FieldValue, RowData, UnitRecord, UnitType, fields, rows};

/// Column order of the initial-conditions row table.
const IC_COLUMNS: [&str; 7] = [
    rows::FLOW,
    rows::STAGE,
    rows::FROUDE,
    rows::VELOCITY,
    rows::UMODE,
    rows::USTATE,
    rows::ELEVATION,
];

/// Default column-header line written by the factory.
pub const IC_COLUMN_HEADER: &str =
    " label             flow     stage    froude  velocity     umode    ustate         z";

fn field_text(record: &UnitRecord, key: &str) -> String {
    record
        .fields
        .get(key)
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .to_string()
}

fn fixed_slice(line: &str, start: usize, width: usize) -> &str {
    let end = (start + width).min(line.len());
    line.get(start.min(line.len())..end).unwrap_or("")
}

fn parse_count(line: &str, line_no: usize) -> Result<i64> {
    fixed_slice(line, 0, 10)
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::Parse {
            line: line_no,
            message: format!("expected ten-wide count, found {:?}", fixed_slice(line, 0, 10)),
        })
}

/// A ten-wide count that sizes a row block; negative values are malformed.
fn parse_row_count(line: &str, line_no: usize) -> Result<usize> {
    let count = parse_count(line, line_no)?;
    usize::try_from(count).map_err(|_| Error::Parse {
        line: line_no,
        message: format!("negative row count {count}"),
    })
}

fn require(lines: &[String], offset: usize, needed: usize, what: &str) -> Result<()> {
    if offset + needed > lines.len() {
        return Err(Error::Parse {
            line: lines.len(),
            message: format!("truncated {what} record"),
        });
    }
    Ok(())
}

fn text_row(line: &str) -> RowData {
    let mut row = RowData::new();
    row.insert(rows::TEXT.to_string(), FieldValue::Text(line.to_string()));
    row
}

fn row_text(row: &RowData) -> String {
    row.get(rows::TEXT)
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .to_string()
}

/// Header record: title, revision marker, ten-wide node count + verbatim
/// remainder, then verbatim lines until the next keyword.
pub struct HeaderHandler;

impl RecordHandler for HeaderHandler {
    fn parse(
        &self,
        lines: &[String],
        offset: usize,
        _record_index: usize,
    ) -> Result<(usize, UnitRecord)> {
        require(lines, offset, 3, "header")?;
        let mut record = UnitRecord::new("Header", UnitType::Header);
        record.fields.insert(
            fields::TITLE.to_string(),
            FieldValue::Text(lines[offset].clone()),
        );
        record.fields.insert(
            fields::REVISION.to_string(),
            FieldValue::Text(lines[offset + 1].clone()),
        );

        let count_line = &lines[offset + 2];
        let node_count = parse_count(count_line, offset + 2)?;
        record
            .fields
            .insert(fields::NODE_COUNT.to_string(), FieldValue::Int(node_count));
        record.fields.insert(
            fields::TAIL.to_string(),
            FieldValue::Text(count_line.get(10..).unwrap_or("").to_string()),
        );

        let mut next = offset + 3;
        while next < lines.len() && !is_keyword(&lines[next]) {
            record.add_row(text_row(&lines[next]));
            next += 1;
        }
        Ok((next, record))
    }

    fn format(&self, record: &UnitRecord) -> Vec<String> {
        let node_count = record
            .fields
            .get(fields::NODE_COUNT)
            .and_then(|v| v.as_int())
            .unwrap_or(0);
        let mut out = vec![
            field_text(record, fields::TITLE),
            field_text(record, fields::REVISION),
            format!("{:>10}{}", node_count, field_text(record, fields::TAIL)),
        ];
        out.extend(record.rows.iter().map(row_text));
        out
    }
}

/// Comment record: `COMMENT`, ten-wide line count, then the text lines.
pub struct CommentHandler;

impl RecordHandler for CommentHandler {
    fn parse(
        &self,
        lines: &[String],
        offset: usize,
        _record_index: usize,
    ) -> Result<(usize, UnitRecord)> {
        require(lines, offset, 2, "comment")?;
        let count = parse_row_count(&lines[offset + 1], offset + 1)?;
        require(lines, offset, 2 + count, "comment")?;

        let mut record = UnitRecord::new("Comment", UnitType::Comment);
        for line in &lines[offset + 2..offset + 2 + count] {
            record.add_row(text_row(line));
        }
        Ok((offset + 2 + count, record))
    }

    fn format(&self, record: &UnitRecord) -> Vec<String> {
        let mut out = vec![
            "COMMENT".to_string(),
            format!("{:>10}", record.rows.len()),
        ];
        out.extend(record.rows.iter().map(row_text));
        out
    }
}

/// River cross-section: title line, `SECTION`, name, verbatim spill line,
/// ten-wide row count, then fixed-width chainage/elevation/roughness rows
/// with verbatim tails.
pub struct RiverHandler;

impl RecordHandler for RiverHandler {
    fn parse(
        &self,
        lines: &[String],
        offset: usize,
        _record_index: usize,
    ) -> Result<(usize, UnitRecord)> {
        require(lines, offset, 5, "river")?;
        let name = lines[offset + 2].trim().to_string();
        let mut record = UnitRecord::new(name, UnitType::River);
        record.fields.insert(
            fields::TITLE.to_string(),
            FieldValue::Text(lines[offset].clone()),
        );
        record.fields.insert(
            fields::SECTION_LINE.to_string(),
            FieldValue::Text(lines[offset + 1].clone()),
        );
        record.fields.insert(
            fields::SPILL.to_string(),
            FieldValue::Text(lines[offset + 3].clone()),
        );

        let count = parse_row_count(&lines[offset + 4], offset + 4)?;
        require(lines, offset, 5 + count, "river")?;
        for (i, line) in lines[offset + 5..offset + 5 + count].iter().enumerate() {
            let mut row = RowData::new();
            for (col, key) in [rows::CHAINAGE, rows::ELEVATION, rows::ROUGHNESS]
                .iter()
                .enumerate()
            {
                let value = fixed_slice(line, col * 10, 10).trim().parse::<f64>().map_err(
                    |_| Error::Parse {
                        line: offset + 5 + i,
                        message: format!("bad {key} column"),
                    },
                )?;
                row.insert(key.to_string(), FieldValue::Num(value));
            }
            row.insert(
                rows::TAIL.to_string(),
                FieldValue::Text(line.get(30..).unwrap_or("").to_string()),
            );
            record.add_row(row);
        }
        Ok((offset + 5 + count, record))
    }

    fn format(&self, record: &UnitRecord) -> Vec<String> {
        // Fresh records have no verbatim title yet; synthesize one so the
        // output re-detects as a river block.
        let title = match record.fields.get(fields::TITLE).and_then(|v| v.as_text()) {
            Some(text) => text.to_string(),
            None => format!("RIVER {}", record.name()),
        };
        let section = match record
            .fields
            .get(fields::SECTION_LINE)
            .and_then(|v| v.as_text())
        {
            Some(text) => text.to_string(),
            None => "SECTION".to_string(),
        };
        let mut out = vec![
            title,
            section,
            record.name().to_string(),
            field_text(record, fields::SPILL),
            format!("{:>10}", record.rows.len()),
        ];
        for row in &record.rows {
            let num = |key: &str| row.get(key).and_then(|v| v.as_num()).unwrap_or(0.0);
            let tail = row
                .get(rows::TAIL)
                .and_then(|v| v.as_text())
                .unwrap_or_default();
            out.push(format!(
                "{:>10.3}{:>10.3}{:>10.3}{}",
                num(rows::CHAINAGE),
                num(rows::ELEVATION),
                num(rows::ROUGHNESS),
                tail
            ));
        }
        out
    }
}

/// Initial-conditions record: keyword line, verbatim column-header line,
/// then one row per node — label left-justified twelve-wide plus seven
/// ten-wide numeric columns.
pub struct InitialConditionsHandler;

impl RecordHandler for InitialConditionsHandler {
    fn parse(
        &self,
        lines: &[String],
        offset: usize,
        _record_index: usize,
    ) -> Result<(usize, UnitRecord)> {
        require(lines, offset, 2, "initial conditions")?;
        let mut record = UnitRecord::new("Initial Conditions", UnitType::InitialConditions);
        record.fields.insert(
            fields::COLUMN_HEADER.to_string(),
            FieldValue::Text(lines[offset + 1].clone()),
        );

        let mut next = offset + 2;
        while next < lines.len() && !is_keyword(&lines[next]) {
            let line = &lines[next];
            let mut row = RowData::new();
            row.insert(
                rows::LABEL.to_string(),
                FieldValue::Text(fixed_slice(line, 0, 12).trim().to_string()),
            );
            for (col, key) in IC_COLUMNS.iter().enumerate() {
                let raw = fixed_slice(line, 12 + col * 10, 10).trim();
                if !raw.is_empty() {
                    let value = raw.parse::<f64>().map_err(|_| Error::Parse {
                        line: next,
                        message: format!("bad {key} column"),
                    })?;
                    row.insert(key.to_string(), FieldValue::Num(value));
                }
            }
            record.add_row(row);
            next += 1;
        }
        Ok((next, record))
    }

    fn format(&self, record: &UnitRecord) -> Vec<String> {
        let mut out = vec![
            "INITIAL CONDITIONS".to_string(),
            field_text(record, fields::COLUMN_HEADER),
        ];
        for row in &record.rows {
            let label = row.get(rows::LABEL).map(|v| v.label()).unwrap_or_default();
            let mut line = format!("{label:<12}");
            for key in IC_COLUMNS {
                let value = row.get(key).and_then(|v| v.as_num()).unwrap_or(0.0);
                line.push_str(&format!("{value:>10.3}"));
            }
            out.push(line);
        }
        out
    }
}

/// Fallback for record types the registry does not know: lines are carried
/// verbatim until the next recognized keyword.
pub struct UnknownHandler;

impl RecordHandler for UnknownHandler {
    fn parse(
        &self,
        lines: &[String],
        offset: usize,
        _record_index: usize,
    ) -> Result<(usize, UnitRecord)> {
        require(lines, offset, 1, "unknown")?;
        let mut record = UnitRecord::new("Unknown", UnitType::Unknown);
        record.add_row(text_row(&lines[offset]));
        let mut next = offset + 1;
        while next < lines.len() && !is_keyword(&lines[next]) {
            record.add_row(text_row(&lines[next]));
            next += 1;
        }
        Ok((next, record))
    }

    fn format(&self, record: &UnitRecord) -> Vec<String> {
        record.rows.iter().map(row_text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn river_block() -> Vec<String> {
        vec![
            "RIVER Culvert Exit CH:7932".to_string(),
            "SECTION".to_string(),
            "1.067".to_string(),
            "    15.078            1.111111      1000".to_string(),
            "         3".to_string(),
            "     5.996    37.560     0.080LEFT".to_string(),
            "     6.936    37.197     0.035".to_string(),
            "     7.446    36.726     0.035RIGHT".to_string(),
        ]
    }

    #[test]
    fn river_round_trip_is_byte_exact() {
        let block = river_block();
        let handler = RiverHandler;
        let (next, record) = handler.parse(&block, 0, 0).unwrap();
        assert_eq!(next, block.len());
        assert_eq!(record.name(), "1.067");
        assert_eq!(record.rows.len(), 3);
        assert_eq!(handler.format(&record), block);
    }

    #[test]
    fn river_rows_parse_fixed_columns() {
        let block = river_block();
        let (_, record) = RiverHandler.parse(&block, 0, 0).unwrap();
        let row = &record.rows[0];
        assert_eq!(row.get(rows::CHAINAGE).unwrap().as_num(), Some(5.996));
        assert_eq!(row.get(rows::ELEVATION).unwrap().as_num(), Some(37.560));
        assert_eq!(row.get(rows::ROUGHNESS).unwrap().as_num(), Some(0.080));
        assert_eq!(row.get(rows::TAIL).unwrap().as_text(), Some("LEFT"));
    }

    #[test]
    fn header_round_trip_preserves_tail() {
        let block = vec![
            "Baseline 1% AEP Run".to_string(),
            "#REVISION#1".to_string(),
            "        62     0.750     0.900     0.100     0.002        12".to_string(),
            "RAD FILE".to_string(),
        ];
        let handler = HeaderHandler;
        let (next, record) = handler.parse(&block, 0, 0).unwrap();
        assert_eq!(next, block.len());
        assert_eq!(
            record.fields.get(fields::NODE_COUNT).unwrap().as_int(),
            Some(62)
        );
        assert_eq!(handler.format(&record), block);
    }

    #[test]
    fn header_stops_at_next_keyword() {
        let mut block = vec![
            "Title".to_string(),
            "#REVISION#1".to_string(),
            "         0".to_string(),
        ];
        block.push("RIVER starts here".to_string());
        let (next, _) = HeaderHandler.parse(&block, 0, 0).unwrap();
        assert_eq!(next, 3);
    }

    #[test]
    fn comment_round_trip() {
        let block = vec![
            "COMMENT".to_string(),
            "         2".to_string(),
            "first line".to_string(),
            "second line".to_string(),
        ];
        let handler = CommentHandler;
        let (next, record) = handler.parse(&block, 0, 0).unwrap();
        assert_eq!(next, block.len());
        assert_eq!(handler.format(&record), block);
    }

    #[test]
    fn initial_conditions_round_trip() {
        let block = vec![
            "INITIAL CONDITIONS".to_string(),
            IC_COLUMN_HEADER.to_string(),
            format!(
                "{:<12}{:>10.3}{:>10.3}{:>10.3}{:>10.3}{:>10.3}{:>10.3}{:>10.3}",
                "1.067", 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0
            ),
        ];
        let handler = InitialConditionsHandler;
        let (next, record) = handler.parse(&block, 0, 0).unwrap();
        assert_eq!(next, block.len());
        assert_eq!(record.rows.len(), 1);
        assert_eq!(
            record.rows[0].get(rows::LABEL).unwrap().as_text(),
            Some("1.067")
        );
        assert_eq!(record.rows[0].get(rows::FLOW).unwrap().as_num(), Some(3.0));
        assert_eq!(handler.format(&record), block);
    }

    #[test]
    fn unknown_consumes_until_keyword() {
        let block = vec![
            "SOMETHING ELSE".to_string(),
            "   data line".to_string(),
            "RIVER next".to_string(),
        ];
        let handler = UnknownHandler;
        let (next, record) = handler.parse(&block, 0, 0).unwrap();
        assert_eq!(next, 2);
        assert_eq!(handler.format(&record), &block[..2]);
    }

    #[test]
    fn fresh_river_formats_with_a_detectable_keyword() {
        let record = crate::unit::UnitRecord::new("1.067", crate::unit::UnitType::River);
        let block = RiverHandler.format(&record);
        assert_eq!(block[0], "RIVER 1.067");
        assert_eq!(block[1], "SECTION");
        assert_eq!(block[4], format!("{:>10}", 0));
    }

    #[test]
    fn truncated_river_is_a_parse_error() {
        let block = vec!["RIVER x".to_string(), "SECTION".to_string()];
        assert!(matches!(
            RiverHandler.parse(&block, 0, 0),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn negative_comment_count_is_a_parse_error() {
        let block = vec!["COMMENT".to_string(), format!("{:>10}", -1)];
        assert!(matches!(
            CommentHandler.parse(&block, 0, 0),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn negative_river_row_count_is_a_parse_error() {
        let block = vec![
            "RIVER reach".to_string(),
            "SECTION".to_string(),
            "1.067".to_string(),
            String::new(),
            format!("{:>10}", -3),
        ];
        assert!(matches!(
            RiverHandler.parse(&block, 0, 0),
            Err(Error::Parse { .. })
        ));
    }
}
