//! Client-side editing session for a single document.
//!
//! `EditorState` owns a copy of a document's title, identifier and section
//! tree. Every mutation either returns the updated tree or an [`EditorError`]
//! and leaves the tree untouched on failure.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    check_details, walk, Block, BlockContent, BlockKind, Detail, Document, DocumentDraft,
    DocumentUpdate, ModelError, Section,
};

pub const DEFAULT_SECTION_TITLE: &str = "New section";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("{0}")]
    Validation(String),
    #[error("removal was not confirmed")]
    Unconfirmed,
    #[error("field `{field}` does not apply to {kind} blocks")]
    NotApplicable { field: &'static str, kind: &'static str },
}

impl From<ModelError> for EditorError {
    fn from(err: ModelError) -> Self {
        EditorError::Validation(err.to_string())
    }
}

/// Caller's answer to a destructive-operation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Child-index path from the root sequence to a section. `SectionPath::from(2)`
/// addresses the third top-level section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SectionPath(Vec<usize>);

impl SectionPath {
    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        SectionPath(indices.into())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn child(&self, index: usize) -> SectionPath {
        let mut indices = self.0.clone();
        indices.push(index);
        SectionPath(indices)
    }

    /// Parses `"0.2.1"` style paths.
    pub fn parse(text: &str) -> Option<SectionPath> {
        text.split('.')
            .map(|part| part.trim().parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()
            .filter(|indices| !indices.is_empty())
            .map(SectionPath)
    }
}

impl From<usize> for SectionPath {
    fn from(index: usize) -> Self {
        SectionPath(vec![index])
    }
}

impl From<&[usize]> for SectionPath {
    fn from(indices: &[usize]) -> Self {
        SectionPath(indices.to_vec())
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Fields to merge into a block. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPatch {
    #[serde(default)]
    pub block_title: Option<String>,
    #[serde(default)]
    pub block_description: Option<String>,
    #[serde(default)]
    pub raw_value: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Label,
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    title: String,
    identifier: String,
    sections: Vec<Section>,
    is_new: bool,
}

impl EditorState {
    pub fn new_document() -> Self {
        EditorState {
            title: String::new(),
            identifier: String::new(),
            sections: Vec::new(),
            is_new: true,
        }
    }

    pub fn from_document(doc: &Document) -> Self {
        EditorState {
            title: doc.title.clone(),
            identifier: doc.identifier.clone(),
            sections: doc.sections.clone(),
            is_new: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn section(&self, path: impl Into<SectionPath>) -> Result<&Section, EditorError> {
        let path = path.into();
        let (first, rest) = split_path(&path)?;
        let mut section = get_index(&self.sections, first, "section")?;
        for &index in rest {
            section = get_index(&section.nested_sections, index, "nested section")?;
        }
        Ok(section)
    }

    pub fn set_title(&mut self, title: &str) -> Result<&[Section], EditorError> {
        if title.trim().is_empty() {
            return Err(EditorError::Validation("document title must not be empty".into()));
        }
        self.title = title.trim().to_string();
        Ok(&self.sections)
    }

    pub fn set_identifier(&mut self, identifier: &str) -> Result<&[Section], EditorError> {
        if !self.is_new {
            return Err(EditorError::Validation(
                "identifier cannot change after creation".into(),
            ));
        }
        if identifier.trim().is_empty() {
            return Err(EditorError::Validation("identifier must not be empty".into()));
        }
        self.identifier = identifier.trim().to_string();
        Ok(&self.sections)
    }

    pub fn add_section(&mut self) -> Result<&[Section], EditorError> {
        self.sections.push(default_section());
        Ok(&self.sections)
    }

    pub fn add_subsection(&mut self, parent: impl Into<SectionPath>) -> Result<&[Section], EditorError> {
        self.section_mut(&parent.into())?
            .nested_sections
            .push(default_section());
        Ok(&self.sections)
    }

    pub fn remove_section(
        &mut self,
        path: impl Into<SectionPath>,
        confirmation: Confirmation,
    ) -> Result<&[Section], EditorError> {
        let path = path.into();
        let (last, parent) = path
            .indices()
            .split_last()
            .ok_or(EditorError::IndexOutOfRange {
                what: "section",
                index: 0,
                len: self.sections.len(),
            })?;
        let siblings = if parent.is_empty() {
            &mut self.sections
        } else {
            &mut self.section_mut(&SectionPath::from(parent))?.nested_sections
        };
        if *last >= siblings.len() {
            return Err(EditorError::IndexOutOfRange {
                what: "section",
                index: *last,
                len: siblings.len(),
            });
        }
        if confirmation == Confirmation::Declined {
            return Err(EditorError::Unconfirmed);
        }
        siblings.remove(*last);
        Ok(&self.sections)
    }

    pub fn update_section_meta(
        &mut self,
        path: impl Into<SectionPath>,
        title: &str,
        subtitle: Option<&str>,
    ) -> Result<&[Section], EditorError> {
        if title.trim().is_empty() {
            return Err(EditorError::Validation("section title must not be empty".into()));
        }
        let section = self.section_mut(&path.into())?;
        section.title = title.trim().to_string();
        section.subtitle = subtitle
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(&self.sections)
    }

    pub fn add_block(
        &mut self,
        path: impl Into<SectionPath>,
        kind: BlockKind,
    ) -> Result<&[Section], EditorError> {
        self.section_mut(&path.into())?.blocks.push(Block::empty(kind));
        Ok(&self.sections)
    }

    pub fn remove_block(
        &mut self,
        path: impl Into<SectionPath>,
        block_index: usize,
    ) -> Result<&[Section], EditorError> {
        let blocks = &mut self.section_mut(&path.into())?.blocks;
        get_index(blocks, block_index, "block")?;
        blocks.remove(block_index);
        Ok(&self.sections)
    }

    /// Merge `patch` into a block. The block's variant never changes; a field
    /// the variant does not carry is rejected before anything is written.
    pub fn update_block(
        &mut self,
        path: impl Into<SectionPath>,
        block_index: usize,
        patch: BlockPatch,
    ) -> Result<&[Section], EditorError> {
        let block = self.block_mut(&path.into(), block_index)?;
        let kind = block.kind();

        let carries_raw = !matches!(kind, BlockKind::DetailList);
        let carries_image = matches!(kind, BlockKind::Image);
        if patch.raw_value.is_some() && !carries_raw {
            return Err(not_applicable("rawValue", kind));
        }
        if patch.image_url.is_some() && !carries_image {
            return Err(not_applicable("imageUrl", kind));
        }
        if patch.alt_text.is_some() && !carries_image {
            return Err(not_applicable("altText", kind));
        }

        if let Some(title) = patch.block_title {
            block.block_title = Some(title).filter(|t| !t.is_empty());
        }
        if let Some(description) = patch.block_description {
            block.block_description = Some(description).filter(|d| !d.is_empty());
        }
        match &mut block.content {
            BlockContent::PlainText { raw_value }
            | BlockContent::CodeBlock { raw_value }
            | BlockContent::NetworkMap { raw_value }
            | BlockContent::Credentials { raw_value, .. } => {
                if let Some(value) = patch.raw_value {
                    *raw_value = value;
                }
            }
            BlockContent::Image {
                image_url,
                alt_text,
                raw_value,
            } => {
                if let Some(url) = patch.image_url {
                    *image_url = url;
                }
                if let Some(alt) = patch.alt_text {
                    *alt_text = alt;
                }
                if let Some(caption) = patch.raw_value {
                    *raw_value = Some(caption).filter(|c| !c.is_empty());
                }
            }
            BlockContent::DetailList { .. } => {}
        }
        Ok(&self.sections)
    }

    pub fn add_detail(
        &mut self,
        path: impl Into<SectionPath>,
        block_index: usize,
    ) -> Result<&[Section], EditorError> {
        self.details_mut(&path.into(), block_index)?
            .push(Detail::new("", ""));
        Ok(&self.sections)
    }

    pub fn remove_detail(
        &mut self,
        path: impl Into<SectionPath>,
        block_index: usize,
        detail_index: usize,
    ) -> Result<&[Section], EditorError> {
        let details = self.details_mut(&path.into(), block_index)?;
        get_index(details, detail_index, "detail")?;
        details.remove(detail_index);
        Ok(&self.sections)
    }

    pub fn update_detail(
        &mut self,
        path: impl Into<SectionPath>,
        block_index: usize,
        detail_index: usize,
        field: DetailField,
        value: &str,
    ) -> Result<&[Section], EditorError> {
        let details = self.details_mut(&path.into(), block_index)?;
        let len = details.len();
        let detail = details
            .get_mut(detail_index)
            .ok_or(EditorError::IndexOutOfRange {
                what: "detail",
                index: detail_index,
                len,
            })?;
        match field {
            DetailField::Label => detail.label = value.to_string(),
            DetailField::Value => detail.value = value.to_string(),
        }
        Ok(&self.sections)
    }

    /// Paths of sections that currently hold no blocks. Saving is still
    /// allowed; callers show these as warnings.
    pub fn sections_without_blocks(&self) -> Vec<SectionPath> {
        let mut out = Vec::new();
        let mut path: Vec<usize> = Vec::new();
        let mut prev_depth = 0;
        for (depth, section) in walk(&self.sections) {
            if depth > prev_depth {
                path.push(0);
            } else {
                path.truncate(depth);
                if let Some(last) = path.last_mut() {
                    *last += 1;
                }
            }
            prev_depth = depth;
            if section.blocks.is_empty() {
                out.push(SectionPath(path.clone()));
            }
        }
        out
    }

    /// Body for creating this document. Details added with
    /// [`add_detail`](Self::add_detail) start blank and must be filled in
    /// first.
    pub fn to_draft(&self) -> Result<DocumentDraft, EditorError> {
        let draft = DocumentDraft {
            title: self.title.clone(),
            identifier: self.identifier.clone(),
            sections: self.sections.clone(),
        };
        draft.validate()?;
        check_details(&draft.sections)?;
        Ok(draft)
    }

    /// Body for replacing this document's title and sections.
    pub fn to_update(&self) -> Result<DocumentUpdate, EditorError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::EmptyField("title").into());
        }
        check_details(&self.sections)?;
        Ok(DocumentUpdate {
            title: Some(self.title.clone()),
            identifier: Some(self.identifier.clone()),
            sections: Some(self.sections.clone()),
        })
    }

    fn section_mut(&mut self, path: &SectionPath) -> Result<&mut Section, EditorError> {
        let (first, rest) = split_path(path)?;
        let len = self.sections.len();
        let mut section = self
            .sections
            .get_mut(first)
            .ok_or(EditorError::IndexOutOfRange {
                what: "section",
                index: first,
                len,
            })?;
        for &index in rest {
            let len = section.nested_sections.len();
            section = section
                .nested_sections
                .get_mut(index)
                .ok_or(EditorError::IndexOutOfRange {
                    what: "nested section",
                    index,
                    len,
                })?;
        }
        Ok(section)
    }

    fn block_mut(&mut self, path: &SectionPath, block_index: usize) -> Result<&mut Block, EditorError> {
        let blocks = &mut self.section_mut(path)?.blocks;
        let len = blocks.len();
        blocks.get_mut(block_index).ok_or(EditorError::IndexOutOfRange {
            what: "block",
            index: block_index,
            len,
        })
    }

    fn details_mut(
        &mut self,
        path: &SectionPath,
        block_index: usize,
    ) -> Result<&mut Vec<Detail>, EditorError> {
        let block = self.block_mut(path, block_index)?;
        let kind = block.kind();
        block
            .content
            .details_mut()
            .ok_or_else(|| not_applicable("details", kind))
    }
}

fn default_section() -> Section {
    Section::new(DEFAULT_SECTION_TITLE).with_block(Block::empty(BlockKind::PlainText))
}

fn split_path(path: &SectionPath) -> Result<(usize, &[usize]), EditorError> {
    path.indices()
        .split_first()
        .map(|(first, rest)| (*first, rest))
        .ok_or_else(|| EditorError::Validation("empty section path".into()))
}

fn get_index<'a, T>(items: &'a [T], index: usize, what: &'static str) -> Result<&'a T, EditorError> {
    items.get(index).ok_or(EditorError::IndexOutOfRange {
        what,
        index,
        len: items.len(),
    })
}

fn not_applicable(field: &'static str, kind: BlockKind) -> EditorError {
    EditorError::NotApplicable {
        field,
        kind: kind.tag(),
    }
}
