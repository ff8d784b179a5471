//! The template language as the host sees it.
//!
//! [`Language`] is the entry point a host binds to: it names the language,
//! owns the document registry, hands out colorizers and view bridges, and
//! publishes the combined color-class table. Classes `1..=k` belong to the
//! contained language; this language's own [`PALETTE`] follows at
//! `k+1..=k+n`. Index 0 is reserved.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use tracing::debug;

use crate::colorizer::Colorizer;
use crate::host::{ContainedLanguageFactory, HostServices, TextBuffer, TextView};
use crate::registry::DocumentRegistry;
use crate::settings::Settings;
use crate::source::DocumentPair;
use crate::view::ViewBridge;
use crate::{Error, Result};

/// Host palette slots a colorable item may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorIndex {
	#[default]
	Automatic,
	Black,
	Blue,
	Green,
	Cyan,
	Red,
	Magenta,
	Brown,
	LightGray,
	DarkGray,
	DarkBlue,
	DarkGreen,
	DarkCyan,
	Maroon,
	Purple,
	Yellow,
	White,
	/// The host's configured plain-text foreground.
	UserTextFg,
	/// The host's configured plain-text background.
	UserTextBg,
}

bitflags! {
	/// Font styling of a colorable item.
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct FontFlags: u8 {
		const BOLD = 1 << 0;
		const STRIKETHROUGH = 1 << 1;
	}
}

/// A named color class with its default styling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorableItem {
	pub name: Cow<'static, str>,
	pub foreground: ColorIndex,
	pub background: ColorIndex,
	pub font: FontFlags,
}

impl ColorableItem {
	const fn spark(name: &'static str, foreground: ColorIndex) -> Self {
		Self {
			name: Cow::Borrowed(name),
			foreground,
			background: ColorIndex::UserTextBg,
			font: FontFlags::empty(),
		}
	}

	/// An item drawn in the host's plain-text colors.
	pub fn plain(name: impl Into<Cow<'static, str>>) -> Self {
		Self {
			name: name.into(),
			foreground: ColorIndex::UserTextFg,
			background: ColorIndex::UserTextBg,
			font: FontFlags::empty(),
		}
	}
}

/// This language's color classes, as carried by paint entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TokenClass {
	AttributeName = 1,
	AttributeQuotes,
	AttributeValue,
	CdataSection,
	Comment,
	Delimiter,
	Keyword,
	Code,
	ElementName,
	Text,
	ProcessingInstruction,
	String,
}

impl TokenClass {
	pub const ALL: [TokenClass; 12] = [
		Self::AttributeName,
		Self::AttributeQuotes,
		Self::AttributeValue,
		Self::CdataSection,
		Self::Comment,
		Self::Delimiter,
		Self::Keyword,
		Self::Code,
		Self::ElementName,
		Self::Text,
		Self::ProcessingInstruction,
		Self::String,
	];

	/// The class number written into paint entries.
	pub const fn class(self) -> u32 {
		self as u32
	}

	pub fn item(self) -> &'static ColorableItem {
		&PALETTE[self as usize - 1]
	}
}

/// Default styling for each [`TokenClass`], in class order.
pub static PALETTE: [ColorableItem; 12] = [
	ColorableItem::spark("Spark Attribute Name", ColorIndex::Red),
	ColorableItem::spark("Spark Attribute Quotes", ColorIndex::UserTextFg),
	ColorableItem::spark("Spark Attribute Value", ColorIndex::Blue),
	ColorableItem::spark("Spark CDATA Section", ColorIndex::DarkGray),
	ColorableItem::spark("Spark Comment", ColorIndex::DarkGreen),
	ColorableItem::spark("Spark Delimiter", ColorIndex::Blue),
	ColorableItem::spark("Spark Keyword", ColorIndex::Blue),
	ColorableItem::spark("Spark Code", ColorIndex::UserTextFg),
	ColorableItem::spark("Spark Element Name", ColorIndex::Maroon),
	ColorableItem::spark("Spark Text", ColorIndex::UserTextFg),
	ColorableItem::spark("Spark Processing Instruction", ColorIndex::DarkGray),
	ColorableItem::spark("Spark String", ColorIndex::Maroon),
];

/// A template language bound to one host.
pub struct Language {
	registry: Arc<DocumentRegistry>,
	contained: Arc<dyn ContainedLanguageFactory>,
	settings: Arc<Settings>,
}

impl Language {
	/// Binds the language to `services`.
	///
	/// The contained-language factory is required up front; the other
	/// collaborators are checked when a document pair first needs them.
	pub fn new(services: HostServices, settings: Settings) -> Result<Self> {
		let contained = services
			.require_contained()
			.map_err(|e| e.into_initialization())?
			.clone();
		let settings = Arc::new(settings);
		debug!(
			language = %settings.language.name,
			contained = %settings.language.contained,
			contained_classes = contained.color_class_count(),
			"Language created"
		);
		Ok(Self {
			registry: Arc::new(DocumentRegistry::new(services, settings.clone())),
			contained,
			settings,
		})
	}

	/// Display name.
	pub fn name(&self) -> &str {
		&self.settings.language.name
	}

	pub fn extension(&self) -> &str {
		&self.settings.language.extension
	}

	pub fn settings(&self) -> &Arc<Settings> {
		&self.settings
	}

	pub fn registry(&self) -> &Arc<DocumentRegistry> {
		&self.registry
	}

	/// The document pair for `buffer`, created on first use.
	pub fn source(&self, buffer: &Arc<dyn TextBuffer>) -> Result<Arc<DocumentPair>> {
		self.registry.get_or_create(buffer)
	}

	/// Bias applied to this language's color classes.
	pub fn namespace_offset(&self) -> u32 {
		u32::try_from(self.contained.color_class_count()).unwrap_or(u32::MAX)
	}

	pub fn colorizer(&self, buffer: &Arc<dyn TextBuffer>) -> Result<Colorizer> {
		let pair = self.source(buffer)?;
		Ok(Colorizer::new(pair, self.namespace_offset()))
	}

	/// Opens a bridge for `view`, inserting it into the view's command chain.
	pub fn open_view(&self, view: Arc<dyn TextView>) -> Result<Arc<ViewBridge>> {
		ViewBridge::open(self.registry.clone(), view)
	}

	/// Number of color classes across both bands.
	pub fn item_count(&self) -> usize {
		self.contained.color_class_count() + PALETTE.len()
	}

	/// The colorable item at `index` in the combined table.
	pub fn colorable_item(&self, index: usize) -> Result<ColorableItem> {
		let contained = self.contained.color_class_count();
		if index <= contained {
			return Ok(self
				.contained
				.colorable_item(index)
				.unwrap_or_else(|| ColorableItem::plain("Plain Text")));
		}
		PALETTE
			.get(index - contained - 1)
			.cloned()
			.ok_or(Error::InvalidColorableItem(index))
	}
}

impl fmt::Debug for Language {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Language")
			.field("name", &self.name())
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;
	use crate::buffer::RopeBuffer;
	use crate::testing::{MockContainedFactory, ToyGenerator, init_tracing, services};

	fn language(classes: usize) -> Language {
		init_tracing();
		Language::new(
			services(Arc::new(MockContainedFactory::new(classes)), ToyGenerator::default()),
			Settings::embedded().unwrap(),
		)
		.unwrap()
	}

	#[test]
	fn metadata_comes_from_settings() {
		let language = language(3);
		assert_eq!(language.name(), "Spark");
		assert_eq!(language.extension(), ".spark");
		assert_eq!(language.item_count(), 15);
		assert_eq!(language.namespace_offset(), 3);
	}

	#[test]
	fn palette_matches_token_classes() {
		for class in TokenClass::ALL {
			assert!(class.item().name.starts_with("Spark "));
		}
		assert_eq!(TokenClass::AttributeName.class(), 1);
		assert_eq!(TokenClass::String.class(), PALETTE.len() as u32);
		assert_eq!(TokenClass::ElementName.item().foreground, ColorIndex::Maroon);
	}

	#[rstest]
	#[case(0, "Plain Text")]
	#[case(1, "Contained 1")]
	#[case(3, "Contained 3")]
	#[case(4, "Spark Attribute Name")]
	#[case(9, "Spark Delimiter")]
	#[case(15, "Spark String")]
	fn colorable_item_bands(#[case] index: usize, #[case] name: &str) {
		assert_eq!(language(3).colorable_item(index).unwrap().name, name);
	}

	#[test]
	fn colorable_item_past_both_bands_is_invalid() {
		assert!(matches!(
			language(3).colorable_item(16),
			Err(Error::InvalidColorableItem(16))
		));
	}

	#[test]
	fn requires_contained_factory() {
		let err = Language::new(HostServices::new(), Settings::embedded().unwrap()).unwrap_err();
		assert!(matches!(err, Error::Initialization(_)));
	}

	#[test]
	fn colorizer_is_biased_by_contained_classes() {
		let language = language(40);
		let buffer: Arc<dyn TextBuffer> = Arc::new(RopeBuffer::new("<p>@foo</p>"));
		let colorizer = language.colorizer(&buffer).unwrap();
		assert_eq!(colorizer.namespace_offset(), 40);
		assert!(Arc::ptr_eq(colorizer.pair(), &language.source(&buffer).unwrap()));
	}
}
