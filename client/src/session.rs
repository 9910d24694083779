//! Line-oriented editing commands for one document.
//!
//! Each input line parses into an [`EditCommand`]; [`apply`] runs it against an
//! [`EditorState`]. Paths are dotted child indices (`0.2.1`).

use anyhow::{anyhow, bail, Context, Result};
use shared::{
    BlockContent, BlockKind, BlockPatch, Confirmation, DetailField, EditorError, EditorState,
    Section, SectionPath,
};

pub const HELP: &str = "\
commands:
  show                                  print the section outline
  title <text>                          set the document title
  id <text>                             set the identifier (new documents only)
  add-section                           append a top-level section
  add-sub <path>                        append a nested section
  rm-section <path>                     remove a section (asks for confirmation)
  meta <path> <title> [| <subtitle>]    rename a section
  add-block <path> <kind>               kinds: plainText detailList credentials codeBlock image networkMap
  rm-block <path> <block>
  set <path> <block> <field> <text>     fields: title description value url alt
  add-detail <path> <block>
  rm-detail <path> <block> <detail>
  detail <path> <block> <detail> label|value <text>
  preview                               render the document as HTML
  save                                  send the document to the server
  quit                                  leave without saving
";

#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    Show,
    Help,
    Title(String),
    Identifier(String),
    AddSection,
    AddSubsection(SectionPath),
    RemoveSection(SectionPath),
    SectionMeta {
        path: SectionPath,
        title: String,
        subtitle: Option<String>,
    },
    AddBlock(SectionPath, BlockKind),
    RemoveBlock(SectionPath, usize),
    UpdateBlock(SectionPath, usize, BlockPatch),
    AddDetail(SectionPath, usize),
    RemoveDetail(SectionPath, usize, usize),
    UpdateDetail {
        path: SectionPath,
        block: usize,
        detail: usize,
        field: DetailField,
        value: String,
    },
    Preview,
    Save,
    Quit,
}

impl EditCommand {
    /// Commands that delete content must be confirmed before they run.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, EditCommand::RemoveSection(_))
    }
}

struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn word(&mut self, what: &str) -> Result<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            bail!("missing {what}");
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (word, rest) = trimmed.split_at(end);
        self.rest = rest;
        Ok(word)
    }

    fn path(&mut self) -> Result<SectionPath> {
        let word = self.word("section path")?;
        SectionPath::parse(word).ok_or_else(|| anyhow!("invalid section path `{word}`"))
    }

    fn index(&mut self, what: &str) -> Result<usize> {
        let word = self.word(what)?;
        word.parse()
            .with_context(|| format!("invalid {what} `{word}`"))
    }

    fn text(&mut self, what: &str) -> Result<&'a str> {
        let text = self.rest.trim();
        if text.is_empty() {
            bail!("missing {what}");
        }
        self.rest = "";
        Ok(text)
    }

    fn finish(&self) -> Result<()> {
        match self.rest.trim() {
            "" => Ok(()),
            extra => bail!("unexpected `{extra}`"),
        }
    }
}

pub fn parse(line: &str) -> Result<EditCommand> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let mut args = Args { rest };

    let command = match name {
        "show" | "ls" => EditCommand::Show,
        "help" | "?" => EditCommand::Help,
        "title" => EditCommand::Title(args.text("title")?.to_string()),
        "id" => EditCommand::Identifier(args.text("identifier")?.to_string()),
        "add-section" => EditCommand::AddSection,
        "add-sub" => EditCommand::AddSubsection(args.path()?),
        "rm-section" => EditCommand::RemoveSection(args.path()?),
        "meta" => {
            let path = args.path()?;
            let text = args.text("section title")?;
            let (title, subtitle) = match text.split_once('|') {
                Some((title, subtitle)) => (title.trim(), Some(subtitle.trim().to_string())),
                None => (text, None),
            };
            EditCommand::SectionMeta {
                path,
                title: title.to_string(),
                subtitle,
            }
        }
        "add-block" => {
            let path = args.path()?;
            let tag = args.word("block kind")?;
            let kind = BlockKind::from_tag(tag).ok_or_else(|| anyhow!("unknown block kind `{tag}`"))?;
            EditCommand::AddBlock(path, kind)
        }
        "rm-block" => EditCommand::RemoveBlock(args.path()?, args.index("block index")?),
        "set" => {
            let path = args.path()?;
            let block = args.index("block index")?;
            let field = args.word("field")?;
            let value = args.rest.trim().to_string();
            args.rest = "";
            let mut patch = BlockPatch::default();
            match field {
                "title" => patch.block_title = Some(value),
                "description" => patch.block_description = Some(value),
                "value" => patch.raw_value = Some(value),
                "url" => patch.image_url = Some(value),
                "alt" => patch.alt_text = Some(value),
                other => bail!("unknown block field `{other}`"),
            }
            EditCommand::UpdateBlock(path, block, patch)
        }
        "add-detail" => EditCommand::AddDetail(args.path()?, args.index("block index")?),
        "rm-detail" => EditCommand::RemoveDetail(
            args.path()?,
            args.index("block index")?,
            args.index("detail index")?,
        ),
        "detail" => {
            let path = args.path()?;
            let block = args.index("block index")?;
            let detail = args.index("detail index")?;
            let field = match args.word("detail field")? {
                "label" => DetailField::Label,
                "value" => DetailField::Value,
                other => bail!("unknown detail field `{other}`"),
            };
            let value = args.rest.trim().to_string();
            args.rest = "";
            EditCommand::UpdateDetail {
                path,
                block,
                detail,
                field,
                value,
            }
        }
        "preview" => EditCommand::Preview,
        "save" => EditCommand::Save,
        "quit" | "exit" => EditCommand::Quit,
        "" => bail!("empty command"),
        other => bail!("unknown command `{other}` (try `help`)"),
    };
    args.finish()?;
    Ok(command)
}

/// Run a mutating command. Non-mutating commands are handled by the caller and
/// leave the state untouched here.
pub fn apply(
    state: &mut EditorState,
    command: EditCommand,
    confirmation: Confirmation,
) -> Result<(), EditorError> {
    let result = match command {
        EditCommand::Title(title) => state.set_title(&title),
        EditCommand::Identifier(identifier) => state.set_identifier(&identifier),
        EditCommand::AddSection => state.add_section(),
        EditCommand::AddSubsection(path) => state.add_subsection(path),
        EditCommand::RemoveSection(path) => state.remove_section(path, confirmation),
        EditCommand::SectionMeta {
            path,
            title,
            subtitle,
        } => state.update_section_meta(path, &title, subtitle.as_deref()),
        EditCommand::AddBlock(path, kind) => state.add_block(path, kind),
        EditCommand::RemoveBlock(path, block) => state.remove_block(path, block),
        EditCommand::UpdateBlock(path, block, patch) => state.update_block(path, block, patch),
        EditCommand::AddDetail(path, block) => state.add_detail(path, block),
        EditCommand::RemoveDetail(path, block, detail) => {
            state.remove_detail(path, block, detail)
        }
        EditCommand::UpdateDetail {
            path,
            block,
            detail,
            field,
            value,
        } => state.update_detail(path, block, detail, field, &value),
        EditCommand::Show
        | EditCommand::Help
        | EditCommand::Preview
        | EditCommand::Save
        | EditCommand::Quit => return Ok(()),
    };
    result.map(|_| ())
}

/// Indented outline of the section tree, one line per section and block.
pub fn outline(state: &EditorState) -> String {
    let mut out = format!(
        "{} [{}]{}\n",
        if state.title().is_empty() { "(untitled)" } else { state.title() },
        if state.identifier().is_empty() { "no identifier" } else { state.identifier() },
        if state.is_new() { " (new)" } else { "" },
    );
    let mut stack: Vec<(SectionPath, &Section)> = state
        .sections()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, s)| (SectionPath::from(i), s))
        .collect();
    while let Some((path, section)) = stack.pop() {
        let indent = "  ".repeat(path.indices().len());
        out.push_str(&format!("{indent}{path} {}", section.title));
        if let Some(subtitle) = &section.subtitle {
            out.push_str(&format!(" ({subtitle})"));
        }
        out.push('\n');
        for (i, block) in section.blocks.iter().enumerate() {
            out.push_str(&format!("{indent}  #{i} {}", block.kind().label()));
            if let Some(title) = &block.block_title {
                out.push_str(&format!(": {title}"));
            }
            if let BlockContent::DetailList { details } = &block.content {
                out.push_str(&format!(" ({} details)", details.len()));
            }
            out.push('\n');
        }
        for (i, child) in section.nested_sections.iter().enumerate().rev() {
            stack.push((path.child(i), child));
        }
    }
    out
}
