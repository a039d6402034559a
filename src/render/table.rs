// fgtctl - CLI for the FortiGate REST API
// Copyright (C) 2024 fgtctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::render::format::{PLACEHOLDER, truncate};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{ContentArrangement, Table as Grid};

/// Headers plus rows of already formatted cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_cell_width: Option<usize>,
}

impl Table {
    pub fn new<I, S>(headers: I, max_cell_width: Option<usize>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            max_cell_width,
        }
    }

    /// Adds a row, padding short rows with placeholders and truncating every
    /// cell to the width budget.
    pub fn push_row(&mut self, cells: Vec<String>) {
        let mut row: Vec<String> = cells
            .into_iter()
            .take(self.headers.len())
            .map(|cell| truncate(&cell, self.max_cell_width))
            .collect();
        row.resize(self.headers.len(), PLACEHOLDER.to_string());
        self.rows.push(row);
    }

    #[cfg(test)]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut grid = Grid::new();
        grid.load_preset(ASCII_FULL)
            .set_content_arrangement(ContentArrangement::Disabled)
            .set_header(self.headers.clone());
        for row in &self.rows {
            grid.add_row(row.clone());
        }
        grid.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Banner(String),
    Note(String),
    Table(Table),
}

/// Everything one invocation prints, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding a single line of text.
    pub fn message(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.note(text);
        doc
    }

    pub fn banner(&mut self, title: impl Into<String>) {
        self.blocks.push(Block::Banner(title.into()));
    }

    pub fn note(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Note(text.into()));
    }

    pub fn table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Banner plus table; skipped entirely when the table has no rows.
    pub fn section(&mut self, title: impl Into<String>, table: Table) -> bool {
        if table.is_empty() {
            return false;
        }
        self.banner(title);
        self.table(table);
        true
    }

    #[cfg(test)]
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }

    /// Section titles in order.
    #[cfg(test)]
    pub fn banners(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Banner(title) => Some(title.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// False when the document only carries banners or notes.
    pub fn has_tables(&self) -> bool {
        self.blocks.iter().any(|block| matches!(block, Block::Table(_)))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Banner(title) => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("=== {title} ===\n"));
                }
                Block::Note(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                Block::Table(table) => {
                    out.push_str(&table.render());
                    out.push('\n');
                }
            }
        }
        out
    }
}
