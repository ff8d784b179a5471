use proptest::prelude::*;
use ropey::Rope;

use super::*;

#[test]
fn test_first_line() {
	let text = Rope::from("hello\nworld\n");
	assert_eq!(
		char_to_line_col(text.slice(..), 3).unwrap(),
		LineCol::new(0, 3)
	);
}

#[test]
fn test_second_line() {
	let text = Rope::from("hello\nworld\n");
	// "hello\n" = 6 chars, + 2 = 8
	assert_eq!(
		char_to_line_col(text.slice(..), 8).unwrap(),
		LineCol::new(1, 2)
	);
	assert_eq!(line_col_to_char(text.slice(..), LineCol::new(1, 2)).unwrap(), 8);
}

#[test]
fn test_end_of_text_is_addressable() {
	let text = Rope::from("ab\ncd");
	assert_eq!(
		char_to_line_col(text.slice(..), 5).unwrap(),
		LineCol::new(1, 2)
	);
	assert_eq!(
		char_to_line_col(text.slice(..), 6),
		Err(PositionError::CharOutOfBounds { pos: 6, len: 5 })
	);
}

#[test]
fn test_trailing_newline_opens_empty_line() {
	let text = Rope::from("ab\n");
	assert_eq!(
		char_to_line_col(text.slice(..), 3).unwrap(),
		LineCol::new(1, 0)
	);
	assert_eq!(line_start(text.slice(..), 1).unwrap(), 3);
	assert_eq!(line_len(text.slice(..), 1).unwrap(), 0);
}

#[test]
fn test_line_out_of_bounds() {
	let text = Rope::from("one\ntwo");
	assert_eq!(
		line_start(text.slice(..), 2),
		Err(PositionError::LineOutOfBounds { line: 2, lines: 2 })
	);
	assert_eq!(
		line_col_to_char(text.slice(..), LineCol::new(5, 0)),
		Err(PositionError::LineOutOfBounds { line: 5, lines: 2 })
	);
}

#[test]
fn test_column_out_of_bounds() {
	let text = Rope::from("one\ntwo");
	assert_eq!(
		line_col_to_char(text.slice(..), LineCol::new(1, 4)),
		Err(PositionError::ColumnOutOfBounds {
			line: 1,
			col: 4,
			len: 3
		})
	);
}

#[test]
fn test_line_len_excludes_breaks() {
	let text = Rope::from("one\r\ntwo\nthree");
	assert_eq!(line_len(text.slice(..), 0).unwrap(), 3);
	assert_eq!(line_len(text.slice(..), 1).unwrap(), 3);
	assert_eq!(line_len(text.slice(..), 2).unwrap(), 5);
}

#[test]
fn test_empty_text() {
	let text = Rope::from("");
	assert_eq!(
		char_to_line_col(text.slice(..), 0).unwrap(),
		LineCol::new(0, 0)
	);
	assert_eq!(line_start(text.slice(..), 0).unwrap(), 0);
	assert_eq!(line_len(text.slice(..), 0).unwrap(), 0);
}

fn arb_document() -> impl Strategy<Value = String> {
	proptest::collection::vec(
		prop_oneof![
			4 => "[a-z@<>/ ]{0,8}",
			1 => Just("\n".to_string()),
			1 => Just("\r\n".to_string()),
		],
		0..24,
	)
	.prop_map(|parts| parts.concat())
}

proptest! {
	/// Every offset survives a trip through line/column form.
	#[test]
	fn prop_offset_round_trip(doc in arb_document()) {
		let text = Rope::from(doc.as_str());
		let slice = text.slice(..);
		for pos in 0..=text.len_chars() {
			let at = char_to_line_col(slice, pos).unwrap();
			prop_assert_eq!(line_col_to_char(slice, at).unwrap(), pos);
		}
	}
}
