use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("section is missing a title")]
    UntitledSection,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("detail needs both a label and a value")]
    IncompleteDetail,
    #[error("detail in section `{0}` needs both a label and a value")]
    IncompleteDetailIn(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    pub identifier: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Document {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            identifier: self.identifier.clone(),
            title: self.title.clone(),
            last_updated: self.last_updated,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub identifier: String,
    pub title: String,
    pub last_updated: DateTime<Utc>,
}

/// Body of a document creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub title: String,
    pub identifier: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl DocumentDraft {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::EmptyField("title"));
        }
        if self.identifier.trim().is_empty() {
            return Err(ModelError::EmptyField("identifier"));
        }
        Ok(())
    }

    pub fn into_document(self, created_by: Option<String>, now: DateTime<Utc>) -> Document {
        Document {
            title: self.title.trim().to_string(),
            identifier: self.identifier.trim().to_string(),
            sections: self.sections,
            last_updated: now,
            created_at: now,
            created_by,
        }
    }
}

/// Body of a full-document update. The identifier, when present, must match
/// the document being replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
}

impl DocumentUpdate {
    pub fn apply(self, doc: &mut Document, now: DateTime<Utc>) -> Result<(), ModelError> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(ModelError::EmptyField("title"));
            }
            doc.title = title.trim().to_string();
        }
        if let Some(sections) = self.sections {
            doc.sections = sections;
        }
        doc.last_updated = now;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSection")]
pub struct Section {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub blocks: Vec<Block>,
    pub nested_sections: Vec<Section>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    nested_sections: Vec<Section>,
}

impl TryFrom<RawSection> for Section {
    type Error = ModelError;

    fn try_from(raw: RawSection) -> Result<Self, Self::Error> {
        let title = raw
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(ModelError::UntitledSection)?;
        Ok(Section {
            title,
            subtitle: raw.subtitle,
            blocks: raw.blocks,
            nested_sections: raw.nested_sections,
        })
    }
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Section {
            title: title.into(),
            subtitle: None,
            blocks: Vec::new(),
            nested_sections: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_nested(mut self, section: Section) -> Self {
        self.nested_sections.push(section);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    PlainText,
    DetailList,
    Credentials,
    CodeBlock,
    Image,
    NetworkMap,
}

impl BlockKind {
    pub const ALL: [BlockKind; 6] = [
        BlockKind::PlainText,
        BlockKind::DetailList,
        BlockKind::Credentials,
        BlockKind::CodeBlock,
        BlockKind::Image,
        BlockKind::NetworkMap,
    ];

    /// Label shown next to a block in editor views.
    pub fn label(self) -> &'static str {
        match self {
            BlockKind::PlainText => "Plain text",
            BlockKind::DetailList => "Detail list",
            BlockKind::Credentials => "Credentials",
            BlockKind::CodeBlock => "Code block",
            BlockKind::Image => "Image",
            BlockKind::NetworkMap => "Network map",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::PlainText => "plainText",
            BlockKind::DetailList => "detailList",
            BlockKind::Credentials => "credentials",
            BlockKind::CodeBlock => "codeBlock",
            BlockKind::Image => "image",
            BlockKind::NetworkMap => "networkMap",
        }
    }

    pub fn from_tag(tag: &str) -> Option<BlockKind> {
        BlockKind::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_description: Option<String>,
    #[serde(flatten)]
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "camelCase")]
pub enum BlockContent {
    #[serde(rename_all = "camelCase")]
    PlainText {
        #[serde(default)]
        raw_value: String,
    },
    DetailList {
        #[serde(default)]
        details: Vec<Detail>,
    },
    #[serde(rename_all = "camelCase")]
    Credentials {
        #[serde(default)]
        raw_value: String,
        #[serde(default)]
        details: Vec<Detail>,
    },
    #[serde(rename_all = "camelCase")]
    CodeBlock {
        #[serde(default)]
        raw_value: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        #[serde(default)]
        image_url: String,
        #[serde(default)]
        alt_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_value: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NetworkMap {
        #[serde(default)]
        raw_value: String,
    },
}

impl BlockContent {
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::PlainText => BlockContent::PlainText {
                raw_value: String::new(),
            },
            BlockKind::DetailList => BlockContent::DetailList {
                details: Vec::new(),
            },
            BlockKind::Credentials => BlockContent::Credentials {
                raw_value: String::new(),
                details: Vec::new(),
            },
            BlockKind::CodeBlock => BlockContent::CodeBlock {
                raw_value: String::new(),
            },
            BlockKind::Image => BlockContent::Image {
                image_url: String::new(),
                alt_text: String::new(),
                raw_value: None,
            },
            BlockKind::NetworkMap => BlockContent::NetworkMap {
                raw_value: String::new(),
            },
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::PlainText { .. } => BlockKind::PlainText,
            BlockContent::DetailList { .. } => BlockKind::DetailList,
            BlockContent::Credentials { .. } => BlockKind::Credentials,
            BlockContent::CodeBlock { .. } => BlockKind::CodeBlock,
            BlockContent::Image { .. } => BlockKind::Image,
            BlockContent::NetworkMap { .. } => BlockKind::NetworkMap,
        }
    }

    pub fn details(&self) -> Option<&[Detail]> {
        match self {
            BlockContent::DetailList { details } | BlockContent::Credentials { details, .. } => {
                Some(details.as_slice())
            }
            _ => None,
        }
    }

    pub fn details_mut(&mut self) -> Option<&mut Vec<Detail>> {
        match self {
            BlockContent::DetailList { details } | BlockContent::Credentials { details, .. } => {
                Some(details)
            }
            _ => None,
        }
    }
}

impl Block {
    pub fn new(content: BlockContent) -> Self {
        Block {
            block_title: None,
            block_description: None,
            content,
        }
    }

    pub fn empty(kind: BlockKind) -> Self {
        Block::new(BlockContent::empty(kind))
    }

    pub fn plain_text(raw_value: impl Into<String>) -> Self {
        Block::new(BlockContent::PlainText {
            raw_value: raw_value.into(),
        })
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }
}

/// One label/value row. Both halves are required, so a detail with a blank
/// label or value never deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDetail")]
pub struct Detail {
    pub label: String,
    pub value: String,
}

#[derive(Deserialize)]
struct RawDetail {
    label: String,
    value: String,
}

impl TryFrom<RawDetail> for Detail {
    type Error = ModelError;

    fn try_from(raw: RawDetail) -> Result<Self, Self::Error> {
        let detail = Detail {
            label: raw.label,
            value: raw.value,
        };
        if !detail.is_complete() {
            return Err(ModelError::IncompleteDetail);
        }
        Ok(detail)
    }
}

impl Detail {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Detail {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.label.trim().is_empty() && !self.value.trim().is_empty()
    }
}

/// Fails on the first section holding a detail with a blank label or value.
/// Editors build details field by field, so the tree is checked before it is
/// sent.
pub fn check_details(sections: &[Section]) -> Result<(), ModelError> {
    for (_, section) in walk(sections) {
        let incomplete = section
            .blocks
            .iter()
            .filter_map(|block| block.content.details())
            .flatten()
            .any(|detail| !detail.is_complete());
        if incomplete {
            return Err(ModelError::IncompleteDetailIn(section.title.clone()));
        }
    }
    Ok(())
}

/// Depth-first pre-order walk over a section tree, yielding each section with
/// its depth (top level is 1). Uses an explicit stack, so tree depth does not
/// grow the call stack.
pub fn walk(sections: &[Section]) -> Walk<'_> {
    Walk {
        stack: vec![(sections.iter(), 1)],
    }
}

#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<(std::slice::Iter<'a, Section>, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Section);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (iter, depth) = self.stack.last_mut()?;
            let depth = *depth;
            match iter.next() {
                Some(section) => {
                    if !section.nested_sections.is_empty() {
                        self.stack.push((section.nested_sections.iter(), depth + 1));
                    }
                    return Some((depth, section));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

pub fn section_count(sections: &[Section]) -> usize {
    walk(sections).count()
}

pub fn max_depth(sections: &[Section]) -> usize {
    walk(sections).map(|(depth, _)| depth).max().unwrap_or(0)
}
