// Word (.docx) templates: reading, filling and writing back the package.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use log::debug;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader as XmlReader, Writer as XmlWriter};
use snafu::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use portarias::{BoxError, Template, TemplateStore, TextUnits};

use crate::generate::*;

const PARAGRAPH: &[u8] = b"w:p";
const RUN: &[u8] = b"w:r";
const TEXT: &[u8] = b"w:t";

// Run content read as a character of the paragraph text.
const SEPARATORS: [char; 2] = ['\t', '\n'];

fn separator(name: &[u8]) -> Option<char> {
    match name {
        b"w:tab" => Some('\t'),
        b"w:br" | b"w:cr" => Some('\n'),
        _ => None,
    }
}

/// Loads the templates from a directory, a fresh copy on every call.
#[derive(Debug, Clone)]
pub struct DocxTemplateStore {
    root: PathBuf,
}

impl DocxTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> DocxTemplateStore {
        DocxTemplateStore { root: root.into() }
    }
}

impl TemplateStore for DocxTemplateStore {
    type Document = DocxDocument;

    fn load(&self, path: &str) -> Result<DocxDocument, BoxError> {
        let full_path = self.root.join(path);
        let bytes = fs::read(&full_path).context(OpeningInputSnafu {
            path: full_path.display().to_string(),
        })?;
        Ok(DocxDocument::from_bytes(&bytes)?)
    }
}

struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    last_modified: Option<DateTime>,
    is_dir: bool,
}

// A w:t element holding some text of a paragraph, after `segment` tabs or breaks.
struct TextRun {
    start: usize,
    text: usize,
    segment: usize,
}

#[derive(Default)]
struct Paragraph {
    runs: Vec<TextRun>,
    breaks: usize,
    original: String,
    text: String,
}

impl Paragraph {
    // Where each piece of the new text goes, one piece per tab or break
    // delimited segment. None if the new text has lost or gained separators.
    fn placements(&self) -> Option<Vec<(usize, &str)>> {
        let pieces: Vec<&str> = self.text.split(SEPARATORS).collect();
        if pieces.len() != self.breaks + 1
            || self.original.split(SEPARATORS).count() != self.breaks + 1
        {
            return None;
        }
        let mut res: Vec<(usize, &str)> = Vec::new();
        for (segment, piece) in pieces.into_iter().enumerate() {
            let mut runs = self.runs.iter().filter(|r| r.segment == segment);
            match runs.next() {
                Some(first) => res.push((first.text, piece)),
                None if piece.is_empty() => {}
                None => return None,
            }
            res.extend(runs.map(|r| (r.text, "")));
        }
        Some(res)
    }
}

struct XmlPart {
    entry: usize,
    events: Vec<Event<'static>>,
    paragraphs: Vec<Paragraph>,
}

/// A Word document held in memory.
///
/// Every paragraph is a text unit, including the paragraphs of table cells
/// and of the headers and footers. The text of a paragraph is the
/// concatenation of its runs, with `\t` for tabs and `\n` for line breaks.
pub struct DocxDocument {
    entries: Vec<PackageEntry>,
    parts: Vec<XmlPart>,
}

fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

impl DocxDocument {
    pub fn from_bytes(bytes: &[u8]) -> CliResult<DocxDocument> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).context(OpeningPackageSnafu {})?;
        let mut entries: Vec<PackageEntry> = Vec::new();
        let mut parts: Vec<XmlPart> = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).context(OpeningPackageSnafu {})?;
            let name = file.name().to_string();
            let mut data: Vec<u8> = Vec::new();
            file.read_to_end(&mut data)
                .context(ReadingEntrySnafu { name: name.clone() })?;
            if is_text_part(&name) {
                let (events, paragraphs) = parse_part(&name, &data)?;
                debug!(
                    "DocxDocument::from_bytes: {}: {} paragraphs",
                    name,
                    paragraphs.len()
                );
                parts.push(XmlPart {
                    entry: entries.len(),
                    events,
                    paragraphs,
                });
            }
            entries.push(PackageEntry {
                name,
                data,
                compression: file.compression(),
                last_modified: file.last_modified(),
                is_dir: file.is_dir(),
            });
        }
        Ok(DocxDocument { entries, parts })
    }

    /// The current text of every paragraph, in document order.
    pub fn paragraphs(&self) -> Vec<&str> {
        self.parts
            .iter()
            .flat_map(|p| p.paragraphs.iter().map(|para| para.text.as_str()))
            .collect()
    }

    pub fn to_bytes(&self) -> CliResult<Vec<u8>> {
        let mut rendered: HashMap<usize, Vec<u8>> = HashMap::new();
        for part in self.parts.iter() {
            if part.paragraphs.iter().any(|p| p.text != p.original) {
                let name = &self.entries[part.entry].name;
                rendered.insert(part.entry, render_part(name, part)?);
            }
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (idx, entry) in self.entries.iter().enumerate() {
            let options = SimpleFileOptions::default()
                .compression_method(entry.compression)
                .last_modified_time(entry.last_modified.unwrap_or_default());
            if entry.is_dir {
                writer
                    .add_directory(entry.name.clone(), options)
                    .context(WritingArchiveSnafu {})?;
                continue;
            }
            writer
                .start_file(entry.name.as_str(), options)
                .context(WritingArchiveSnafu {})?;
            let data = rendered.get(&idx).unwrap_or(&entry.data);
            writer.write_all(data).context(WritingEntrySnafu {
                name: entry.name.clone(),
            })?;
        }
        let cursor = writer.finish().context(WritingArchiveSnafu {})?;
        Ok(cursor.into_inner())
    }
}

impl TextUnits for DocxDocument {
    fn text_units(&mut self) -> Vec<&mut String> {
        self.parts
            .iter_mut()
            .flat_map(|p| p.paragraphs.iter_mut().map(|para| &mut para.text))
            .collect()
    }
}

impl Template for DocxDocument {
    fn save(&self) -> Result<Vec<u8>, BoxError> {
        Ok(self.to_bytes()?)
    }
}

fn parse_part(name: &str, data: &[u8]) -> CliResult<(Vec<Event<'static>>, Vec<Paragraph>)> {
    let mut reader = XmlReader::from_reader(data);
    reader.config_mut().trim_text(false);
    let mut buf: Vec<u8> = Vec::new();
    let mut events: Vec<Event<'static>> = Vec::new();
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    // Paragraphs can nest (text boxes): the innermost one gets the text.
    let mut open: Vec<usize> = Vec::new();
    // The paragraph owning each open run.
    let mut open_runs: Vec<Option<usize>> = Vec::new();
    let mut text_start: Option<usize> = None;
    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(e) => e.into_owned(),
            Err(e) => {
                return XmlSnafu {
                    part: name,
                    reason: e.to_string(),
                }
                .fail()
            }
        };
        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == PARAGRAPH => {
                open.push(paragraphs.len());
                paragraphs.push(Paragraph::default());
            }
            Event::End(e) if e.name().as_ref() == PARAGRAPH => {
                open.pop();
            }
            Event::Start(e) if e.name().as_ref() == RUN => {
                open_runs.push(open.last().copied());
            }
            Event::End(e) if e.name().as_ref() == RUN => {
                open_runs.pop();
            }
            Event::Start(e) | Event::Empty(e) if separator(e.name().as_ref()).is_some() => {
                // Tab stops in w:pPr share the name; only run content counts.
                if let (Some(&p), Some(&Some(owner))) = (open.last(), open_runs.last()) {
                    if p == owner {
                        let para = &mut paragraphs[p];
                        para.original.extend(separator(e.name().as_ref()));
                        para.breaks += 1;
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == TEXT => {
                text_start = Some(events.len());
            }
            Event::End(e) if e.name().as_ref() == TEXT => {
                text_start = None;
            }
            Event::Text(t) => {
                if let (Some(start), Some(&p)) = (text_start, open.last()) {
                    let s = t.unescape().map_err(|e| CliError::Xml {
                        part: name.to_string(),
                        reason: e.to_string(),
                    })?;
                    let para = &mut paragraphs[p];
                    para.original.push_str(&s);
                    para.runs.push(TextRun {
                        start,
                        text: events.len(),
                        segment: para.breaks,
                    });
                }
            }
            _ => {}
        }
        events.push(event);
        buf.clear();
    }
    for para in paragraphs.iter_mut() {
        para.text = para.original.clone();
    }
    Ok((events, paragraphs))
}

// Each segment of a changed paragraph goes in its first w:t, the others are
// emptied. When the separators no longer line up the whole text goes in the
// first w:t of the paragraph.
fn render_part(name: &str, part: &XmlPart) -> CliResult<Vec<u8>> {
    let mut texts: HashMap<usize, &str> = HashMap::new();
    for para in part.paragraphs.iter().filter(|p| p.text != p.original) {
        match para.placements() {
            Some(placements) => texts.extend(placements),
            None => {
                debug!("render_part: {}: separators moved in {:?}", name, para.text);
                for (idx, run) in para.runs.iter().enumerate() {
                    texts.insert(run.text, if idx == 0 { para.text.as_str() } else { "" });
                }
            }
        }
    }
    let preserve: HashSet<usize> = part
        .paragraphs
        .iter()
        .flat_map(|p| p.runs.iter())
        .filter(|r| texts.get(&r.text).map_or(false, |t| !t.is_empty()))
        .map(|r| r.start)
        .collect();

    let mut writer = XmlWriter::new(Cursor::new(Vec::new()));
    for (idx, event) in part.events.iter().enumerate() {
        let res = match (event, texts.get(&idx)) {
            (_, Some(text)) => writer.write_event(Event::Text(BytesText::new(text))),
            (Event::Start(e), None) if preserve.contains(&idx) => {
                let mut elem = BytesStart::new("w:t");
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() != b"xml:space" {
                        elem.push_attribute(attr);
                    }
                }
                elem.push_attribute(("xml:space", "preserve"));
                writer.write_event(Event::Start(elem))
            }
            (e, None) => writer.write_event(e.borrow()),
        };
        res.map_err(|e| CliError::Xml {
            part: name.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(writer.into_inner().into_inner())
}
