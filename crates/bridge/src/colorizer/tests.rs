use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use tandem_primitives::{PaintEntry, RawCorrespondence};

use super::*;
use crate::buffer::RopeBuffer;
use crate::generation::{GeneratedOutput, GenerationService, SourceSupervisor};
use crate::settings::Settings;
use crate::testing::{MockContainedFactory, ToyGenerator, init_tracing, services};

const K: u32 = 100;

fn pair_with(
	factory: MockContainedFactory,
	primary: &str,
	output: GeneratedOutput,
) -> (Arc<RopeBuffer>, Arc<DocumentPair>) {
	init_tracing();
	let buffer = Arc::new(RopeBuffer::new(primary));
	let services = services(Arc::new(factory), ToyGenerator::default());
	let pair =
		DocumentPair::new(buffer.clone(), &services, Arc::new(Settings::embedded().unwrap())).unwrap();
	pair.apply(output).unwrap();
	(buffer, pair)
}

fn colorizer(primary: &str, output: GeneratedOutput) -> Colorizer {
	let (_, pair) = pair_with(MockContainedFactory::new(K as usize), primary, output);
	Colorizer::new(pair, K)
}

#[test]
fn scenario_delegates_mapped_expression() {
	let colorizer = colorizer(
		"<p>@foo</p>",
		GeneratedOutput {
			secondary_text: "foo;".into(),
			correspondences: vec![RawCorrespondence::new(4, 7, 0, 3)],
			paints: Vec::new(),
		},
	);
	assert_eq!(
		colorizer.colorize_line(0, 11, "<p>@foo</p>", 0),
		vec![0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0]
	);
}

#[test]
fn delegated_attributes_override_paint() {
	let colorizer = colorizer(
		"0123456789ab",
		GeneratedOutput {
			secondary_text: "abcd".into(),
			correspondences: vec![RawCorrespondence::new(4, 8, 0, 4)],
			paints: vec![PaintEntry::new(0, 10, 5)],
		},
	);
	let p = 5 + K;
	assert_eq!(
		colorizer.colorize_line(0, 12, "0123456789ab", 0),
		vec![p, p, p, p, 1, 1, 1, 1, p, p, 0, 0, 0]
	);
}

#[test]
fn later_paint_wins_and_zero_class_is_transparent() {
	let colorizer = colorizer(
		"abcdefgh",
		GeneratedOutput {
			secondary_text: "x".into(),
			correspondences: Vec::new(),
			paints: vec![
				PaintEntry::new(0, 8, 3),
				PaintEntry::new(2, 4, 7),
				PaintEntry::new(5, 7, NO_COLOR),
			],
		},
	);
	assert_eq!(
		colorizer.colorize_line(0, 8, "abcdefgh", 0),
		vec![103, 103, 107, 107, 103, 103, 103, 103, 0]
	);
}

#[test]
fn multi_line_mapping_is_cut_per_line() {
	let colorizer = colorizer(
		"ab\ncdef\ngh",
		GeneratedOutput {
			secondary_text: "b\ncdef\ng".into(),
			correspondences: vec![RawCorrespondence::new(1, 9, 0, 8)],
			paints: Vec::new(),
		},
	);
	assert_eq!(colorizer.colorize_line(0, 2, "ab", 0), vec![0, 1, 0]);
	assert_eq!(colorizer.colorize_line(1, 4, "cdef", 0), vec![1, 1, 1, 1, 0]);
	assert_eq!(colorizer.colorize_line(2, 2, "gh", 0), vec![1, 0, 0]);
}

#[test]
fn paint_is_clipped_to_the_requested_line() {
	let colorizer = colorizer(
		"ab\ncdef\ngh",
		GeneratedOutput {
			secondary_text: "x".into(),
			correspondences: Vec::new(),
			paints: vec![PaintEntry::new(1, 5, 2)],
		},
	);
	assert_eq!(colorizer.colorize_line(0, 2, "ab", 0), vec![0, 102, 0]);
	assert_eq!(colorizer.colorize_line(1, 4, "cdef", 0), vec![102, 102, 0, 0, 0]);
	assert_eq!(colorizer.colorize_line(2, 2, "gh", 0), vec![0, 0, 0]);
}

#[test]
fn overlong_length_does_not_paint_the_next_line() {
	let colorizer = colorizer(
		"ab\ncdef",
		GeneratedOutput {
			secondary_text: "cd".into(),
			correspondences: vec![RawCorrespondence::new(3, 5, 0, 2)],
			paints: vec![PaintEntry::new(0, 7, 6)],
		},
	);
	assert_eq!(colorizer.colorize_line(0, 5, "ab", 0), vec![106, 106, 0, 0, 0, 0]);
	assert_eq!(colorizer.colorize_line(1, 6, "cdef", 0), vec![1, 1, 106, 106, 0, 0, 0]);
}

#[rstest]
#[case::empty_line(0, 0)]
#[case::past_last_line(40, 3)]
#[case::longer_than_text(0, 30)]
fn degraded_lines_stay_in_bounds(#[case] line: usize, #[case] length: usize) {
	let colorizer = colorizer(
		"<p>@foo</p>",
		GeneratedOutput {
			secondary_text: "foo;".into(),
			correspondences: vec![RawCorrespondence::new(4, 7, 0, 3)],
			paints: vec![PaintEntry::new(0, 11, 4)],
		},
	);
	let attrs = colorizer.colorize_line(line, length, "", 0);
	assert_eq!(attrs.len(), length + 1);
	assert_eq!(attrs[length], 0);
}

#[test]
fn without_contained_colorizer_only_paint_applies() {
	let (_, pair) = pair_with(
		MockContainedFactory::new(K as usize).without_colorizer(),
		"0123456789",
		GeneratedOutput {
			secondary_text: "abcd".into(),
			correspondences: vec![RawCorrespondence::new(4, 8, 0, 4)],
			paints: vec![PaintEntry::new(0, 10, 5)],
		},
	);
	let colorizer = Colorizer::new(pair, K);
	let mut expected = vec![105; 10];
	expected.push(0);
	assert_eq!(colorizer.colorize_line(0, 10, "0123456789", 0), expected);
}

#[test]
fn begin_colorization_regenerates_and_refreshes_paint() {
	init_tracing();
	let buffer = Arc::new(RopeBuffer::new("<p>@foo</p>"));
	let services = services(Arc::new(MockContainedFactory::new(K as usize)), ToyGenerator::default());
	let pair =
		DocumentPair::new(buffer.clone(), &services, Arc::new(Settings::embedded().unwrap())).unwrap();
	let mut colorizer = Colorizer::new(pair.clone(), K);

	let service: Arc<dyn GenerationService> =
		Arc::new(SourceSupervisor::new(Arc::new(ToyGenerator::with_tag_class(9))));
	pair.set_generation_service(Some(service)).unwrap();

	// Paint captured at construction is still the empty batch.
	assert_eq!(
		colorizer.colorize_line(0, 11, "<p>@foo</p>", 0),
		vec![0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0]
	);

	colorizer.begin_colorization().unwrap();
	let t = 9 + K;
	assert_eq!(
		colorizer.colorize_line(0, 11, "<p>@foo</p>", 0),
		vec![t, t, t, 0, 1, 1, 1, t, t, t, t, 0]
	);

	buffer.insert(7, "9");
	colorizer.begin_colorization().unwrap();
	assert_eq!(pair.secondary_text().to_string(), "foo9;");
	assert_eq!(
		colorizer.colorize_line(0, 12, "<p>@foo9</p>", 0),
		vec![t, t, t, 0, 1, 1, 1, 2, t, t, t, t, 0]
	);
}

#[test]
fn begin_colorization_without_service_still_refreshes_paint() {
	let (_, pair) = pair_with(
		MockContainedFactory::new(K as usize),
		"abc",
		GeneratedOutput::default(),
	);
	let mut colorizer = Colorizer::new(pair.clone(), K);
	pair.apply(GeneratedOutput {
		secondary_text: "x".into(),
		correspondences: Vec::new(),
		paints: vec![PaintEntry::new(0, 1, 1)],
	})
	.unwrap();

	assert!(colorizer.begin_colorization().is_err());
	assert_eq!(colorizer.colorize_line(0, 3, "abc", 0), vec![101, 0, 0, 0]);
}

fn arb_output() -> impl Strategy<Value = GeneratedOutput> {
	let paint = (0usize..40, 0usize..40, 0u32..20).prop_map(|(s, e, c)| PaintEntry::new(s, e, c));
	let corr = (0usize..40, 0usize..40, 0usize..20, 0usize..20)
		.prop_map(|(a, b, c, d)| RawCorrespondence::new(a, b, c, d));
	(
		"[a-z0-9;\n]{0,16}",
		prop::collection::vec(corr, 0..4),
		prop::collection::vec(paint, 0..6),
	)
		.prop_map(|(secondary_text, correspondences, paints)| GeneratedOutput {
			secondary_text,
			correspondences,
			paints,
		})
}

proptest! {
	#[test]
	fn prop_attributes_stay_in_bounds(
		output in arb_output(),
		line in 0usize..5,
		length in 0usize..40,
	) {
		let colorizer = colorizer("<p>\n  @foo bar\n</p>\n@baz", output);
		let attrs = colorizer.colorize_line(line, length, "", 0);
		prop_assert_eq!(attrs.len(), length + 1);
		prop_assert_eq!(attrs[length], 0);
	}

	#[test]
	fn prop_paint_is_biased(
		paints in prop::collection::vec((0usize..30, 0usize..30, 1u32..20), 1..6),
		k in 0u32..1000,
	) {
		let entries: Vec<_> = paints.iter().map(|&(s, e, c)| PaintEntry::new(s, e, c)).collect();
		let classes: Vec<u32> = entries.iter().map(|p| p.color + k).collect();
		let (_, pair) = pair_with(
			MockContainedFactory::new(k as usize),
			"abcdefghijklmnopqrstuvwxyz0123",
			GeneratedOutput {
				secondary_text: "x".into(),
				correspondences: Vec::new(),
				paints: entries,
			},
		);
		let colorizer = Colorizer::new(pair, k);
		let attrs = colorizer.colorize_line(0, 30, "", 0);
		for attr in attrs {
			prop_assert!(attr == 0 || classes.contains(&attr));
		}
	}
}
