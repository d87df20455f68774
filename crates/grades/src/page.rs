use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::course::{Course, Id1, Id2};
use crate::element::GradeInfo;
use crate::grade::{Dist, Grade};
use crate::semester::Semester;
use crate::{Result, SchemaError};

/// Page submitted by a user, together with the client-side hash of `content`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub content: String,
    #[serde(rename = "hashCode")]
    pub hash_code: i64,
}

impl Page {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let hash_code = hash_code(&content) as i64;
        Self { content, hash_code }
    }

    pub fn verify(&self) -> Result<()> {
        let expected = hash_code(&self.content);
        if i64::from(expected) == self.hash_code {
            Ok(())
        } else {
            Err(SchemaError::HashMismatch { expected, actual: self.hash_code })
        }
    }
}

/// 32-bit polynomial string hash, `h = 31 * h + unit` over UTF-16 code
/// units with wrapping arithmetic. Matches what the extension computes in
/// the browser.
pub fn hash_code(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRow {
    pub course: Course,
    pub info: GradeInfo,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedPage {
    pub rows: Vec<ParsedRow>,
    /// Data rows that were present but could not be read.
    pub skipped: usize,
}

const ROW_CELLS: usize = 7;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"))
}

/// Extracts grade rows from a grade page.
///
/// A data row has seven cells:
/// `semester | id1 | id2 | class | title | grade | distribution`, where the
/// distribution cell carries the lower / same / higher percentages.
/// Header rows (no `<td>`) are ignored; malformed data rows are counted in
/// `skipped`.
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let tr_selector = Selector::parse("tr").expect("static selector");
    let td_selector = Selector::parse("td").expect("static selector");

    let mut page = ParsedPage::default();
    for tr in document.select(&tr_selector) {
        let cells: Vec<String> = tr.select(&td_selector).map(cell_text).collect();
        if cells.is_empty() {
            continue;
        }
        match parse_row(&cells) {
            Ok(row) => page.rows.push(row),
            Err(_) => page.skipped += 1,
        }
    }
    page
}

fn cell_text(td: ElementRef<'_>) -> String {
    td.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_row(cells: &[String]) -> Result<ParsedRow> {
    if cells.len() < ROW_CELLS {
        return Err(SchemaError::Row(format!("row has {} cells", cells.len())));
    }
    let semester: Semester = cells[0].parse()?;
    let id1 = Id1::parse(cells[1].as_str())?;
    let id2 = Id2::parse(cells[2].as_str())?;
    let class_id = Some(cells[3].clone()).filter(|c| !c.is_empty());
    let title = cells[4].clone();
    let grade: Grade = cells[5].parse()?;
    let dist = parse_dist(&cells[6])?;

    Ok(ParsedRow {
        course: Course::new(id1.clone(), id2, title),
        info: GradeInfo {
            course_id1: id1,
            semester,
            lecturer: None,
            class_id,
            grade,
            dist,
        },
    })
}

fn parse_dist(text: &str) -> Result<Dist> {
    let nums: Vec<f64> = number_re()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let values: [f64; 3] = nums
        .try_into()
        .map_err(|v: Vec<f64>| SchemaError::Dist(format!("expected 3 numbers, found {}", v.len())))?;
    Dist::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <tr><th>Semester</th><th>No.</th><th>Code</th><th>Class</th><th>Title</th><th>Grade</th><th>Dist</th></tr>
          <tr>
            <td>111-2</td><td>CSIE1212</td><td>902 10750</td><td>01</td>
            <td>Data   Structures</td><td>A+</td><td>62.5% / 12.5% / 25%</td>
          </tr>
          <tr>
            <td>111-1</td><td>MATH4006</td><td>201 49100</td><td></td>
            <td>Calculus</td><td>B</td><td>20 | 30 | 50</td>
          </tr>
          <tr><td>111-1</td><td>broken</td></tr>
          <tr>
            <td>111-1</td><td>PE1001</td><td>001 00100</td><td>02</td>
            <td>Swimming</td><td>Pass</td><td>0 / 100 / 0</td>
          </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn hash_code_matches_reference_values() {
        assert_eq!(hash_code(""), 0);
        assert_eq!(hash_code("a"), 97);
        assert_eq!(hash_code("hello"), 99162322);
        // overflows i32 partway through
        assert_eq!(hash_code("hello world"), 1794106052);
    }

    #[test]
    fn verify_detects_mismatch() {
        let page = Page::new("<html></html>");
        assert!(page.verify().is_ok());

        let tampered = Page { content: "<html>x</html>".into(), hash_code: page.hash_code };
        assert!(matches!(tampered.verify(), Err(SchemaError::HashMismatch { .. })));
    }

    #[test]
    fn page_uses_camel_case_hash_key() {
        let page: Page = serde_json::from_str(r#"{"content":"a","hashCode":97}"#).unwrap();
        assert!(page.verify().is_ok());
    }

    #[test]
    fn parses_rows_and_counts_skipped() {
        let parsed = parse_page(PAGE);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 2);

        let first = &parsed.rows[0];
        assert_eq!(first.course.id1.as_str(), "CSIE1212");
        assert_eq!(first.course.title, "Data Structures");
        assert_eq!(first.info.grade, Grade::APlus);
        assert_eq!(first.info.class_id.as_deref(), Some("01"));
        assert_eq!(first.info.dist.values(), [62.5, 12.5, 25.0]);

        assert_eq!(parsed.rows[1].info.class_id, None);
    }

    #[test]
    fn empty_page_has_no_rows() {
        let parsed = parse_page("<html><body><p>nothing</p></body></html>");
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.skipped, 0);
    }
}
