//! Stable-identity generators for variables and dimensions
//!
//! A generator keeps two generations of named objects. Asking for a name
//! during a pass moves the object from the previous generation into the
//! current one (or creates it); whatever is still in the previous generation
//! when the pass ends was not asked for and gets torn down.

use std::collections::HashMap;
use std::mem;

use super::error::LayoutError;
use super::expr::{Expression, Variable};

/// How an object was obtained from a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// First request ever for this name
    Created,
    /// Carried over from the previous pass
    Reused,
    /// Already requested earlier in the running pass
    Current,
}

/// Two-generation cache of named objects
#[derive(Debug)]
pub(crate) struct Generator<T> {
    previous: HashMap<String, T>,
    current: HashMap<String, T>,
    created: Vec<String>,
    active: bool,
}

impl<T: Clone> Generator<T> {
    pub fn new() -> Self {
        Self {
            previous: HashMap::new(),
            current: HashMap::new(),
            created: Vec::new(),
            active: false,
        }
    }

    pub fn begin_pass(&mut self) {
        let last = mem::take(&mut self.current);
        self.previous.extend(last);
        self.created.clear();
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Look up `name` for the running pass, creating it with `make` if it
    /// never existed.
    pub fn access(
        &mut self,
        name: &str,
        make: impl FnOnce() -> Result<T, LayoutError>,
    ) -> Result<(T, Access), LayoutError> {
        if !self.active {
            return Err(LayoutError::outside_pass(name));
        }
        if let Some(object) = self.current.get(name) {
            return Ok((object.clone(), Access::Current));
        }
        if let Some(object) = self.previous.remove(name) {
            self.current.insert(name.to_string(), object.clone());
            return Ok((object, Access::Reused));
        }
        let object = make()?;
        self.current.insert(name.to_string(), object.clone());
        self.created.push(name.to_string());
        Ok((object, Access::Created))
    }

    /// Objects that will be discarded if the pass ended now
    pub fn doomed(&self) -> impl Iterator<Item = (&String, &T)> {
        self.previous.iter()
    }

    /// Finish the pass, handing back everything that was not requested
    pub fn end_pass(&mut self) -> Vec<(String, T)> {
        self.active = false;
        self.created.clear();
        let mut leftovers: Vec<(String, T)> = self.previous.drain().collect();
        leftovers.sort_by(|a, b| a.0.cmp(&b.0));
        leftovers
    }

    /// Restore the generation of the last completed pass, handing back the
    /// objects created by the failed one.
    pub fn abort_pass(&mut self) -> Vec<(String, T)> {
        self.active = false;
        let mut created: Vec<(String, T)> = mem::take(&mut self.created)
            .into_iter()
            .filter_map(|name| self.current.remove(&name).map(|object| (name, object)))
            .collect();
        created.sort_by(|a, b| a.0.cmp(&b.0));
        let touched = mem::take(&mut self.current);
        self.previous.extend(touched);
        mem::swap(&mut self.previous, &mut self.current);
        created
    }

    /// Object of the last completed pass (or of the running one)
    pub fn get(&self, name: &str) -> Option<&T> {
        self.current.get(name).or_else(|| self.previous.get(name))
    }

    /// Live objects sorted by name
    pub fn live(&self) -> Vec<(&String, &T)> {
        let mut all: Vec<(&String, &T)> = self.current.iter().chain(self.previous.iter()).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }
}

/// One of the six variables of a [`Dimension`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
}

impl Edge {
    pub const ALL: [Edge; 6] = [
        Edge::Left,
        Edge::Right,
        Edge::Top,
        Edge::Bottom,
        Edge::Width,
        Edge::Height,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Edge::Left => "left",
            Edge::Right => "right",
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Width => "width",
            Edge::Height => "height",
        }
    }

    pub fn from_name(name: &str) -> Option<Edge> {
        Edge::ALL.into_iter().find(|e| e.name() == name)
    }
}

/// An axis-aligned box made of six layout variables.
///
/// `right - left = width` and `bottom - top = height` hold for every
/// dimension handed out by a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub left: Variable,
    pub right: Variable,
    pub top: Variable,
    pub bottom: Variable,
    pub width: Variable,
    pub height: Variable,
}

impl Dimension {
    pub fn edge(&self, edge: Edge) -> Variable {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
            Edge::Width => self.width,
            Edge::Height => self.height,
        }
    }

    pub fn variables(&self) -> [Variable; 6] {
        Edge::ALL.map(|e| self.edge(e))
    }

    pub fn center_x(&self) -> Expression {
        0.5 * self.left + 0.5 * self.right
    }

    pub fn center_y(&self) -> Expression {
        0.5 * self.top + 0.5 * self.bottom
    }
}
