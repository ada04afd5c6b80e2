//! In-memory platform for unit tests.
//!
//! A small arena DOM with an HTML fragment parser and a compound-selector
//! matcher, a scripted transport, frame surfaces whose embedded document is
//! a plain struct the test edits, and a `LocalPool` for spawned tasks.
//! Mutation records are queued and delivered by `run`, like a browser's
//! observer callbacks.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, ready};
use serde_json::{Map, Value};

use crate::config::FeditConfig;
use crate::error::FeditError;
use crate::markers::frame as sel;
use crate::page::Page;
use crate::platform::{
    Animator, Browsing, Dom, EventDetail, FrameSignal, FrameSink, FrameSource, FrameSurface,
    Frames, HttpRequest, HttpResponse, InstanceId, Method, ResponseFunc, Timers, Transport,
};
use crate::registry::Registry;

pub const PAGE_URL: &str = "https://example.com/page/";
pub const PAGE_TITLE: &str = "Home";

const VOID: [&str; 8] = ["br", "hr", "img", "input", "meta", "link", "source", "wbr"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeElement(usize);

#[derive(Debug, Clone, Default)]
struct Node {
    /// Empty for text nodes.
    tag: String,
    text: String,
    attrs: Vec<(String, String)>,
    styles: Vec<(String, String)>,
    parent: Option<usize>,
    children: Vec<usize>,
    instance: Option<InstanceId>,
}

/// Runs its closure on drop.
pub struct FakeSubscription(Option<Box<dyn FnOnce()>>);

impl Drop for FakeSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

type Table<T> = Rc<RefCell<Vec<(u64, T)>>>;

fn unsubscribe<T: 'static>(table: &Table<T>, id: u64) -> FakeSubscription {
    let weak: Weak<RefCell<Vec<(u64, T)>>> = Rc::downgrade(table);
    FakeSubscription(Some(Box::new(move || {
        if let Some(table) = weak.upgrade() {
            // Handlers may own subscriptions into this same table, so they
            // are dropped only once the borrow has ended.
            let removed: Vec<(u64, T)> = {
                let mut entries = table.borrow_mut();
                let (removed, kept) = entries.drain(..).partition(|(entry, _)| *entry == id);
                *entries = kept;
                removed
            };
            drop(removed);
        }
    })))
}

#[derive(Debug, Clone)]
pub struct Dispatched {
    pub target: Option<FakeElement>,
    pub name: String,
    pub instance: InstanceId,
    pub context: Map<String, Value>,
}

/// What the embedded document looks like to the surface probes.
#[derive(Debug, Clone)]
pub struct FakeFrameDoc {
    pub present: HashSet<String>,
    pub classes: HashMap<String, Vec<String>>,
    pub attrs: HashMap<(String, String), String>,
    pub title: Option<String>,
    pub ready: bool,
    pub accessible: bool,
    /// Height of the form wrapper.
    pub height: f64,
    /// Height of the form itself.
    pub form_height: f64,
    pub main_html: Option<String>,
    pub watching_ready: bool,
    pub submit_bindings: u32,
    pub cancel_bindings: u32,
    pub widget_inits: u32,
    pub element_height: Option<f64>,
}

impl Default for FakeFrameDoc {
    fn default() -> Self {
        Self {
            present: [sel::FORM, sel::FORM_WRAPPER, sel::FORM_BUTTONS, sel::MAIN, sel::CANCEL_BUTTON]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            classes: HashMap::new(),
            attrs: HashMap::new(),
            title: Some("Edit form".to_owned()),
            ready: true,
            accessible: true,
            height: 300.0,
            form_height: 200.0,
            main_html: None,
            watching_ready: false,
            submit_bindings: 0,
            cancel_bindings: 0,
            widget_inits: 0,
            element_height: None,
        }
    }
}

impl FakeFrameDoc {
    pub fn insert(&mut self, selector: &str) {
        self.present.insert(selector.to_owned());
    }

    pub fn remove(&mut self, selector: &str) {
        self.present.remove(selector);
    }

    pub fn add_class(&mut self, selector: &str, class: &str) {
        self.classes
            .entry(selector.to_owned())
            .or_default()
            .push(class.to_owned());
    }

    pub fn set_attr(&mut self, selector: &str, name: &str, value: &str) {
        self.attrs
            .insert((selector.to_owned(), name.to_owned()), value.to_owned());
    }

    fn has(&self, selector: &str) -> bool {
        self.accessible && self.present.contains(selector)
    }
}

pub struct FakeFrameState {
    element: FakeElement,
    source: FrameSource,
    sink: FrameSink<FormData>,
    doc: RefCell<FakeFrameDoc>,
}

/// Test-side handle on an embedded document.
#[derive(Clone)]
pub struct FakeFrame(Rc<FakeFrameState>);

impl FakeFrame {
    pub fn emit(&self, signal: FrameSignal<FormData>) {
        let sink = self.0.sink.clone();
        sink(signal);
    }

    pub fn submit(&self, fields: &[(&str, &str)]) {
        self.emit(FrameSignal::Submit(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        ));
    }

    pub fn element(&self) -> FakeElement {
        self.0.element
    }

    pub fn source(&self) -> FrameSource {
        self.0.source.clone()
    }

    pub fn doc(&self) -> FakeFrameDoc {
        self.0.doc.borrow().clone()
    }

    pub fn doc_mut(&self, f: impl FnOnce(&mut FakeFrameDoc)) {
        f(&mut self.0.doc.borrow_mut());
    }
}

pub struct FakeSurface(Rc<FakeFrameState>);

impl FrameSurface for FakeSurface {
    type Element = FakeElement;

    fn element(&self) -> FakeElement {
        self.0.element
    }

    fn is_ready(&self) -> bool {
        self.0.doc.borrow().ready
    }

    fn title(&self) -> Option<String> {
        let doc = self.0.doc.borrow();
        doc.accessible.then(|| doc.title.clone()).flatten()
    }

    fn contains(&self, selector: &str) -> bool {
        self.0.doc.borrow().has(selector)
    }

    fn has_class(&self, selector: &str, class: &str) -> bool {
        let doc = self.0.doc.borrow();
        doc.has(selector)
            && doc
                .classes
                .get(selector)
                .is_some_and(|classes| classes.iter().any(|c| c == class))
    }

    fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        let doc = self.0.doc.borrow();
        if !doc.has(selector) {
            return None;
        }
        doc.attrs
            .get(&(selector.to_owned(), name.to_owned()))
            .cloned()
    }

    fn content_height(&self, selector: &str) -> Result<f64, FeditError> {
        let doc = self.0.doc.borrow();
        if !doc.has(selector) {
            return Err(FeditError::FrameInaccessible);
        }
        Ok(if selector == sel::FORM {
            doc.form_height
        } else {
            doc.height
        })
    }

    fn replace_section(&self, selector: &str, html: &str) -> Result<(), FeditError> {
        let mut doc = self.0.doc.borrow_mut();
        if !doc.has(selector) {
            return Err(FeditError::MissingElement(selector.to_owned()));
        }
        doc.main_html = Some(html.to_owned());
        Ok(())
    }

    fn init_widget(&self, selector: &str) -> bool {
        let mut doc = self.0.doc.borrow_mut();
        if doc.has(selector) {
            doc.widget_inits += 1;
            true
        } else {
            false
        }
    }

    fn bind_submit(&self, selector: &str) -> bool {
        let mut doc = self.0.doc.borrow_mut();
        doc.submit_bindings += 1;
        doc.has(selector)
    }

    fn bind_cancel(&self, selector: &str) -> bool {
        let mut doc = self.0.doc.borrow_mut();
        doc.cancel_bindings += 1;
        doc.has(selector)
    }

    fn watch_ready(&self) {
        self.0.doc.borrow_mut().watching_ready = true;
    }

    fn set_height(&self, px: f64) {
        self.0.doc.borrow_mut().element_height = Some(px);
    }
}

pub type FormData = Vec<(String, String)>;

pub struct FakePlatform {
    nodes: RefCell<Vec<Node>>,
    next_handle: Cell<u64>,
    clicks: Table<(FakeElement, Rc<dyn Fn()>)>,
    observers: Table<(FakeElement, Rc<dyn Fn(FakeElement)>)>,
    intervals: Table<Rc<dyn Fn()>>,
    mutations: RefCell<Vec<FakeElement>>,
    events: RefCell<Vec<Dispatched>>,
    tooltips: RefCell<Vec<FakeElement>>,
    focused: Cell<Option<FakeElement>>,

    location: RefCell<String>,
    title: RefCell<String>,
    history: RefCell<Vec<(String, String)>>,
    reloads: Cell<u32>,
    alerts: RefCell<Vec<String>>,
    viewport_height: Cell<f64>,
    cookies: RefCell<HashMap<String, String>>,
    globals: RefCell<HashMap<String, ResponseFunc<FakePlatform>>>,

    responses: RefCell<HashMap<(String, String), VecDeque<Result<HttpResponse, String>>>>,
    requests: RefCell<Vec<HttpRequest<FormData>>>,
    fades: RefCell<Vec<(FakeElement, f64, f64)>>,

    frame_template: RefCell<FakeFrameDoc>,
    frames: RefCell<Vec<Rc<FakeFrameState>>>,

    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl FakePlatform {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            nodes: RefCell::new(vec![Node {
                tag: "body".to_owned(),
                ..Default::default()
            }]),
            next_handle: Cell::new(0),
            clicks: Rc::default(),
            observers: Rc::default(),
            intervals: Rc::default(),
            mutations: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            tooltips: RefCell::new(Vec::new()),
            focused: Cell::new(None),
            location: RefCell::new(PAGE_URL.to_owned()),
            title: RefCell::new(PAGE_TITLE.to_owned()),
            history: RefCell::new(Vec::new()),
            reloads: Cell::new(0),
            alerts: RefCell::new(Vec::new()),
            viewport_height: Cell::new(800.0),
            cookies: RefCell::new(HashMap::new()),
            globals: RefCell::new(HashMap::new()),
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            fades: RefCell::new(Vec::new()),
            frame_template: RefCell::new(FakeFrameDoc::default()),
            frames: RefCell::new(Vec::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    /// A page whose body holds `html`.
    pub fn with_body(html: &str) -> Self {
        let platform = Self::new();
        for root in platform.parse(html) {
            platform.link(0, root, None);
        }
        platform.mutations.borrow_mut().clear();
        platform
    }

    // --- test controls ---

    /// Run spawned tasks and deliver queued mutation records until quiet.
    pub fn run(&self) {
        loop {
            self.pool.borrow_mut().run_until_stalled();
            if !self.flush_mutations() {
                break;
            }
        }
    }

    fn flush_mutations(&self) -> bool {
        let inserted = std::mem::take(&mut *self.mutations.borrow_mut());
        let mut delivered = false;
        for node in inserted {
            if !self.is_connected(&node) {
                continue;
            }
            let observers: Vec<_> = self
                .observers
                .borrow()
                .iter()
                .map(|(_, (root, cb))| (*root, cb.clone()))
                .collect();
            for (root, cb) in observers {
                if self.is_within(node.0, root.0) {
                    cb(node);
                    delivered = true;
                }
            }
        }
        delivered
    }

    pub fn body_element(&self) -> FakeElement {
        FakeElement(0)
    }

    pub fn by_id(&self, id: &str) -> FakeElement {
        self.query(&FakeElement(0), &format!("#{id}"))
            .unwrap_or_else(|| panic!("no element with id {id}"))
    }

    pub fn find(&self, selector: &str) -> Option<FakeElement> {
        self.query(&FakeElement(0), selector)
    }

    pub fn count(&self, selector: &str) -> usize {
        self.query_all(&FakeElement(0), selector).len()
    }

    pub fn click(&self, element: &FakeElement) {
        let handlers: Vec<Rc<dyn Fn()>> = self
            .clicks
            .borrow()
            .iter()
            .filter(|(_, (target, _))| target == element)
            .map(|(_, (_, handler))| handler.clone())
            .collect();
        for handler in handlers {
            handler();
        }
    }

    pub fn click_selector(&self, selector: &str) {
        let element = self
            .find(selector)
            .unwrap_or_else(|| panic!("nothing matches {selector}"));
        self.click(&element);
    }

    pub fn tick_intervals(&self) {
        let ticks: Vec<Rc<dyn Fn()>> = self
            .intervals
            .borrow()
            .iter()
            .map(|(_, tick)| tick.clone())
            .collect();
        for tick in ticks {
            tick();
        }
    }

    pub fn live_intervals(&self) -> usize {
        self.intervals.borrow().len()
    }

    pub fn style(&self, element: &FakeElement, property: &str) -> Option<String> {
        self.nodes.borrow()[element.0]
            .styles
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.clone())
    }

    pub fn outer_html(&self, element: &FakeElement) -> String {
        let mut out = String::new();
        self.serialize(element.0, &mut out);
        out
    }

    pub fn events(&self) -> Vec<Dispatched> {
        self.events.borrow().clone()
    }

    /// Document-level deliveries of `name`.
    pub fn document_events(&self, name: &str) -> Vec<Dispatched> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.target.is_none() && event.name == name)
            .cloned()
            .collect()
    }

    pub fn tooltips(&self) -> Vec<FakeElement> {
        self.tooltips.borrow().clone()
    }

    pub fn focused(&self) -> Option<FakeElement> {
        self.focused.get()
    }

    pub fn set_location(&self, url: &str) {
        *self.location.borrow_mut() = url.to_owned();
    }

    pub fn history(&self) -> Vec<(String, String)> {
        self.history.borrow().clone()
    }

    pub fn reloads(&self) -> u32 {
        self.reloads.get()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    pub fn set_viewport_height(&self, height: f64) {
        self.viewport_height.set(height);
    }

    pub fn set_cookie(&self, name: &str, value: &str) {
        self.cookies
            .borrow_mut()
            .insert(name.to_owned(), value.to_owned());
    }

    pub fn set_global(&self, name: &str, func: ResponseFunc<FakePlatform>) {
        self.globals.borrow_mut().insert(name.to_owned(), func);
    }

    /// Queue a JSON response for the next `method` request to `url`.
    pub fn respond(&self, method: Method, url: &str, status: u16, body: Value) {
        self.responses
            .borrow_mut()
            .entry((method.as_str().to_owned(), url.to_owned()))
            .or_default()
            .push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
    }

    pub fn fail(&self, method: Method, url: &str, reason: &str) {
        self.responses
            .borrow_mut()
            .entry((method.as_str().to_owned(), url.to_owned()))
            .or_default()
            .push_back(Err(reason.to_owned()));
    }

    pub fn requests(&self) -> Vec<HttpRequest<FormData>> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self, method: Method, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.method == method && request.url == url)
            .count()
    }

    pub fn fades(&self) -> Vec<(FakeElement, f64, f64)> {
        self.fades.borrow().clone()
    }

    /// Adjust the document every frame created from now on starts with.
    pub fn frame_doc_mut(&self, f: impl FnOnce(&mut FakeFrameDoc)) {
        f(&mut self.frame_template.borrow_mut());
    }

    pub fn last_frame(&self) -> FakeFrame {
        FakeFrame(
            self.frames
                .borrow()
                .last()
                .cloned()
                .expect("no frame created"),
        )
    }

    pub fn frames_created(&self) -> usize {
        self.frames.borrow().len()
    }

    // --- arena ---

    fn new_node(&self, node: Node) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        nodes.len() - 1
    }

    fn detach(&self, idx: usize) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[idx].parent.take() {
            nodes[parent].children.retain(|child| *child != idx);
        }
    }

    fn link(&self, parent: usize, child: usize, before: Option<usize>) {
        self.detach(child);
        {
            let mut nodes = self.nodes.borrow_mut();
            let position = before
                .and_then(|reference| nodes[parent].children.iter().position(|c| *c == reference))
                .unwrap_or(nodes[parent].children.len());
            nodes[parent].children.insert(position, child);
            nodes[child].parent = Some(parent);
        }
        let is_element = !self.nodes.borrow()[child].tag.is_empty();
        if is_element && self.is_connected(&FakeElement(parent)) {
            self.mutations.borrow_mut().push(FakeElement(child));
        }
    }

    fn is_within(&self, idx: usize, ancestor: usize) -> bool {
        let nodes = self.nodes.borrow();
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = nodes[current].parent;
        }
        false
    }

    fn descendants(&self, idx: usize) -> Vec<usize> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<usize> = nodes[idx].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(nodes[current].children.iter().rev().copied());
        }
        out
    }

    fn attr(&self, idx: usize, name: &str) -> Option<String> {
        self.nodes.borrow()[idx]
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn classes(&self, idx: usize) -> Vec<String> {
        self.attr(idx, "class")
            .map(|value| value.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    fn serialize(&self, idx: usize, out: &mut String) {
        let node = self.nodes.borrow()[idx].clone();
        if node.tag.is_empty() {
            out.push_str(&node.text);
            return;
        }
        out.push('<');
        out.push_str(&node.tag);
        for (name, value) in &node.attrs {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        out.push('>');
        if VOID.contains(&node.tag.as_str()) {
            return;
        }
        for child in &node.children {
            self.serialize(*child, out);
        }
        out.push_str(&format!("</{}>", node.tag));
    }

    // --- parser ---

    /// Parse `html` into detached nodes and return the top-level ones.
    fn parse(&self, html: &str) -> Vec<usize> {
        let mut roots = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut rest = html;

        let attach = |this: &FakePlatform, stack: &Vec<usize>, roots: &mut Vec<usize>, idx: usize| {
            match stack.last() {
                Some(parent) => {
                    let mut nodes = this.nodes.borrow_mut();
                    nodes[*parent].children.push(idx);
                    nodes[idx].parent = Some(*parent);
                }
                None => roots.push(idx),
            }
        };

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("<!--") {
                rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            } else if let Some(after) = rest.strip_prefix("</") {
                let end = after.find('>').unwrap_or(after.len());
                let tag = after[..end].trim().to_lowercase();
                while let Some(open) = stack.pop() {
                    if self.nodes.borrow()[open].tag == tag {
                        break;
                    }
                }
                rest = after.get(end + 1..).unwrap_or("");
            } else if rest.starts_with('<') {
                let end = tag_end(rest);
                let (tag, attrs, self_closing) = parse_tag(&rest[1..end]);
                let idx = self.new_node(Node {
                    tag: tag.clone(),
                    attrs,
                    ..Default::default()
                });
                attach(self, &stack, &mut roots, idx);
                if !self_closing && !VOID.contains(&tag.as_str()) {
                    stack.push(idx);
                }
                rest = rest.get(end + 1..).unwrap_or("");
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = &rest[..end];
                if !text.trim().is_empty() {
                    let idx = self.new_node(Node {
                        text: text.to_owned(),
                        ..Default::default()
                    });
                    attach(self, &stack, &mut roots, idx);
                }
                rest = &rest[end..];
            }
        }
        roots
    }

    // --- selectors ---

    fn matches(&self, idx: usize, selector: &str) -> bool {
        selector
            .split(',')
            .any(|part| self.matches_complex(idx, part.trim()))
    }

    fn matches_complex(&self, idx: usize, selector: &str) -> bool {
        let mut compounds = split_compounds(selector);
        let Some(last) = compounds.pop() else {
            return false;
        };
        if !self.matches_compound(idx, &last) {
            return false;
        }
        let mut cursor = self.nodes.borrow()[idx].parent;
        while let Some(compound) = compounds.last() {
            let Some(current) = cursor else {
                return false;
            };
            if self.matches_compound(current, compound) {
                compounds.pop();
            }
            cursor = self.nodes.borrow()[current].parent;
        }
        true
    }

    fn matches_compound(&self, idx: usize, compound: &str) -> bool {
        let tag = self.nodes.borrow()[idx].tag.clone();
        if tag.is_empty() {
            return false;
        }
        let chars: Vec<char> = compound.chars().collect();
        let mut pos = 0;
        let name = read_ident(&chars, &mut pos);
        if !name.is_empty() && name != "*" && !name.eq_ignore_ascii_case(&tag) {
            return false;
        }
        while pos < chars.len() {
            let marker = chars[pos];
            pos += 1;
            let ok = match marker {
                '#' => {
                    let id = read_ident(&chars, &mut pos);
                    self.attr(idx, "id").as_deref() == Some(id.as_str())
                }
                '.' => {
                    let class = read_ident(&chars, &mut pos);
                    self.classes(idx).contains(&class)
                }
                '[' => {
                    let start = pos;
                    let mut quote = None;
                    while pos < chars.len() {
                        match (quote, chars[pos]) {
                            (None, ']') => break,
                            (None, q @ ('"' | '\'')) => quote = Some(q),
                            (Some(_), '\\') => pos += 1,
                            (Some(q), c) if c == q => quote = None,
                            _ => {}
                        }
                        pos += 1;
                    }
                    let inner: String = chars[start..pos.min(chars.len())].iter().collect();
                    pos += 1;
                    match inner.split_once('=') {
                        None => self.attr(idx, inner.trim()).is_some(),
                        Some((key, value)) => {
                            let value = unquote(value.trim());
                            self.attr(idx, key.trim()).as_deref() == Some(value.as_str())
                        }
                    }
                }
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

fn tag_end(s: &str) -> usize {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '>') => return i,
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    s.len()
}

fn parse_tag(content: &str) -> (String, Vec<(String, String)>, bool) {
    let mut content = content.trim();
    let self_closing = content.ends_with('/');
    if self_closing {
        content = content[..content.len() - 1].trim_end();
    }
    let name_end = content
        .find(char::is_whitespace)
        .unwrap_or(content.len());
    let tag = content[..name_end].to_lowercase();
    let chars: Vec<char> = content[name_end..].chars().collect();
    let mut attrs = Vec::new();
    let mut pos = 0;
    loop {
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }
        let start = pos;
        while pos < chars.len() && !chars[pos].is_whitespace() && chars[pos] != '=' {
            pos += 1;
        }
        let name: String = chars[start..pos].iter().collect::<String>().to_lowercase();
        let mut value = String::new();
        if pos < chars.len() && chars[pos] == '=' {
            pos += 1;
            if pos < chars.len() && (chars[pos] == '"' || chars[pos] == '\'') {
                let quote = chars[pos];
                pos += 1;
                while pos < chars.len() && chars[pos] != quote {
                    value.push(chars[pos]);
                    pos += 1;
                }
                pos += 1;
            } else {
                while pos < chars.len() && !chars[pos].is_whitespace() {
                    value.push(chars[pos]);
                    pos += 1;
                }
            }
        }
        attrs.push((name, value));
    }
    (tag, attrs, self_closing)
}

fn split_compounds(selector: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut quote = None;
    for c in selector.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            (None, c) if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len()
        && (chars[*pos].is_alphanumeric() || matches!(chars[*pos], '-' | '_' | '*'))
    {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    inner.replace("\\\"", "\"").replace("\\\\", "\\")
}

impl Dom for FakePlatform {
    type Element = FakeElement;
    type Subscription = FakeSubscription;

    fn body(&self) -> Option<FakeElement> {
        Some(FakeElement(0))
    }

    fn query(&self, scope: &FakeElement, selector: &str) -> Option<FakeElement> {
        self.descendants(scope.0)
            .into_iter()
            .find(|idx| self.matches(*idx, selector))
            .map(FakeElement)
    }

    fn query_all(&self, scope: &FakeElement, selector: &str) -> Vec<FakeElement> {
        self.descendants(scope.0)
            .into_iter()
            .filter(|idx| self.matches(*idx, selector))
            .map(FakeElement)
            .collect()
    }

    fn closest(&self, element: &FakeElement, selector: &str) -> Option<FakeElement> {
        let mut cursor = Some(element.0);
        while let Some(idx) = cursor {
            if self.matches(idx, selector) {
                return Some(FakeElement(idx));
            }
            cursor = self.nodes.borrow()[idx].parent;
        }
        None
    }

    fn parent(&self, element: &FakeElement) -> Option<FakeElement> {
        self.nodes.borrow()[element.0].parent.map(FakeElement)
    }

    fn children(&self, element: &FakeElement) -> Vec<FakeElement> {
        let nodes = self.nodes.borrow();
        nodes[element.0]
            .children
            .iter()
            .filter(|child| !nodes[**child].tag.is_empty())
            .map(|child| FakeElement(*child))
            .collect()
    }

    fn id(&self, element: &FakeElement) -> String {
        self.attr(element.0, "id").unwrap_or_default()
    }

    fn attribute(&self, element: &FakeElement, name: &str) -> Option<String> {
        self.attr(element.0, name)
    }

    fn set_attribute(&self, element: &FakeElement, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let attrs = &mut nodes[element.0].attrs;
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_owned(),
            None => attrs.push((name.to_owned(), value.to_owned())),
        }
    }

    fn remove_attribute(&self, element: &FakeElement, name: &str) {
        self.nodes.borrow_mut()[element.0]
            .attrs
            .retain(|(key, _)| key != name);
    }

    fn has_class(&self, element: &FakeElement, class: &str) -> bool {
        self.classes(element.0).iter().any(|c| c == class)
    }

    fn add_class(&self, element: &FakeElement, class: &str) {
        let mut classes = self.classes(element.0);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_owned());
            self.set_attribute(element, "class", &classes.join(" "));
        }
    }

    fn remove_class(&self, element: &FakeElement, class: &str) {
        let mut classes = self.classes(element.0);
        classes.retain(|c| c != class);
        self.set_attribute(element, "class", &classes.join(" "));
    }

    fn set_style(&self, element: &FakeElement, property: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let styles = &mut nodes[element.0].styles;
        match styles.iter_mut().find(|(name, _)| name == property) {
            Some(entry) => entry.1 = value.to_owned(),
            None => styles.push((property.to_owned(), value.to_owned())),
        }
    }

    fn inner_html(&self, element: &FakeElement) -> String {
        let children = self.nodes.borrow()[element.0].children.clone();
        let mut out = String::new();
        for child in children {
            self.serialize(child, &mut out);
        }
        out
    }

    fn set_inner_html(&self, element: &FakeElement, html: &str) {
        let old = self.nodes.borrow()[element.0].children.clone();
        for child in old {
            self.detach(child);
        }
        for root in self.parse(html) {
            self.link(element.0, root, None);
        }
    }

    fn create_element(&self, tag: &str) -> Result<FakeElement, FeditError> {
        Ok(FakeElement(self.new_node(Node {
            tag: tag.to_lowercase(),
            ..Default::default()
        })))
    }

    fn parse_fragment(&self, html: &str) -> Option<FakeElement> {
        self.parse(html)
            .into_iter()
            .find(|idx| !self.nodes.borrow()[*idx].tag.is_empty())
            .map(FakeElement)
    }

    fn insert_before(&self, new: &FakeElement, reference: &FakeElement) -> Result<(), FeditError> {
        let parent = self.nodes.borrow()[reference.0]
            .parent
            .ok_or_else(|| FeditError::Platform("reference node has no parent".into()))?;
        self.link(parent, new.0, Some(reference.0));
        Ok(())
    }

    fn append_child(&self, parent: &FakeElement, child: &FakeElement) -> Result<(), FeditError> {
        self.link(parent.0, child.0, None);
        Ok(())
    }

    fn remove(&self, element: &FakeElement) {
        self.detach(element.0);
    }

    fn is_connected(&self, element: &FakeElement) -> bool {
        self.is_within(element.0, 0)
    }

    fn focus(&self, element: &FakeElement) {
        self.focused.set(Some(*element));
    }

    fn on_click(&self, element: &FakeElement, handler: Rc<dyn Fn()>) -> FakeSubscription {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        self.clicks.borrow_mut().push((id, (*element, handler)));
        unsubscribe(&self.clicks, id)
    }

    fn observe_insertions(
        &self,
        root: &FakeElement,
        on_added: Rc<dyn Fn(FakeElement)>,
    ) -> FakeSubscription {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        self.observers.borrow_mut().push((id, (*root, on_added)));
        unsubscribe(&self.observers, id)
    }

    fn dispatch(&self, target: Option<&FakeElement>, name: &str, detail: &EventDetail<FakeElement>) {
        self.events.borrow_mut().push(Dispatched {
            target: target.copied(),
            name: name.to_owned(),
            instance: detail.instance,
            context: detail.context.clone(),
        });
    }

    fn bind_tooltip(&self, element: &FakeElement) {
        self.tooltips.borrow_mut().push(*element);
    }

    fn attach_instance(&self, element: &FakeElement, id: InstanceId) {
        self.nodes.borrow_mut()[element.0].instance = Some(id);
    }

    fn detach_instance(&self, element: &FakeElement) {
        self.nodes.borrow_mut()[element.0].instance = None;
    }

    fn instance_of(&self, element: &FakeElement) -> Option<InstanceId> {
        self.nodes.borrow()[element.0].instance
    }
}

impl Browsing for FakePlatform {
    fn location(&self) -> String {
        self.location.borrow().clone()
    }

    fn title(&self) -> String {
        self.title.borrow().clone()
    }

    fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_owned();
    }

    fn push_state(&self, title: &str, url: &str) {
        self.history
            .borrow_mut()
            .push((title.to_owned(), url.to_owned()));
        *self.location.borrow_mut() = url.to_owned();
    }

    fn reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_owned());
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height.get()
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.borrow().get(name).cloned()
    }

    fn global_function(&self, name: &str) -> Option<ResponseFunc<Self>> {
        self.globals.borrow().get(name).cloned()
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner
            .spawn_local(task)
            .expect("local pool accepts tasks");
    }
}

impl Timers for FakePlatform {
    type Interval = FakeSubscription;

    fn interval(&self, _millis: u32, tick: Rc<dyn Fn()>) -> FakeSubscription {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        self.intervals.borrow_mut().push((id, tick));
        unsubscribe(&self.intervals, id)
    }
}

impl Animator for FakePlatform {
    fn fade(
        &self,
        element: &FakeElement,
        from: f64,
        to: f64,
        _duration_ms: u32,
    ) -> LocalBoxFuture<'static, ()> {
        self.fades.borrow_mut().push((*element, from, to));
        ready(()).boxed_local()
    }
}

impl Transport for FakePlatform {
    type FormData = FormData;

    fn send(
        &self,
        request: HttpRequest<FormData>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, FeditError>> {
        let key = (request.method.as_str().to_owned(), request.url.clone());
        let scripted = self
            .responses
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);
        let result = match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(FeditError::Transport { url, reason }),
            None => Err(FeditError::Transport {
                url,
                reason: "no scripted response".into(),
            }),
        };
        ready(result).boxed_local()
    }
}

impl Frames for FakePlatform {
    type Surface = FakeSurface;

    fn create_frame(
        &self,
        source: &FrameSource,
        id: &str,
        class_name: Option<&str>,
        sink: FrameSink<FormData>,
    ) -> Result<FakeSurface, FeditError> {
        let element = self.create_element("iframe")?;
        self.set_attribute(&element, "id", id);
        if let Some(class_name) = class_name {
            self.set_attribute(&element, "class", class_name);
        }
        match source {
            FrameSource::Url(url) => self.set_attribute(&element, "src", url),
            FrameSource::Inline(html) => self.set_attribute(&element, "srcdoc", html),
        }
        let state = Rc::new(FakeFrameState {
            element,
            source: source.clone(),
            sink,
            doc: RefCell::new(self.frame_template.borrow().clone()),
        });
        self.frames.borrow_mut().push(state.clone());
        Ok(FakeSurface(state))
    }
}

/// A started page over `html` with the default registry.
pub fn page_with(html: &str) -> (Rc<FakePlatform>, Page<FakePlatform>) {
    let platform = Rc::new(FakePlatform::with_body(html));
    let page = Page::new(
        platform.clone(),
        FeditConfig::default(),
        Registry::with_defaults().shared(),
    );
    page.start();
    (platform, page)
}

/// Markup for one region with an edit button.
pub fn region(id: &str, constructor: &str, extra_attrs: &str, inner: &str) -> String {
    format!(
        r#"<div id="{id}" class="wagtail-fedit-adapter-wrapper" data-edit-url="/edit/{id}/" data-refetch-url="/refetch/{id}/" data-fedit-constructor="wagtail_fedit.editors.{constructor}" {extra_attrs}><button class="wagtail-fedit-edit-button">Edit</button>{inner}</div>"#
    )
}

pub fn edit_url(id: &str) -> String {
    format!("https://example.com/edit/{id}/")
}

pub fn refetch_url(id: &str) -> String {
    format!("https://example.com/refetch/{id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_query() {
        let platform = FakePlatform::with_body(
            r#"<div id="a" class="x y"><p data-k='v w'>hi<br>there</p><span id="value" data-block></span></div>"#,
        );
        let a = platform.by_id("a");
        assert!(platform.has_class(&a, "y"));
        assert_eq!(platform.count("div.x p[data-k=\"v w\"]"), 1);
        assert_eq!(platform.count("#value[data-block]"), 1);
        assert_eq!(platform.count(".missing, span"), 1);
        assert_eq!(
            platform.inner_html(&platform.find("p").unwrap()),
            "hi<br>there"
        );
    }

    #[test]
    fn test_insertions_are_queued_until_run() {
        let platform = FakePlatform::with_body("<main></main>");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = platform.observe_insertions(
            &platform.body_element(),
            Rc::new(move |el| sink.borrow_mut().push(el)),
        );
        let node = platform.parse_fragment("<section></section>").unwrap();
        platform
            .append_child(&platform.find("main").unwrap(), &node)
            .unwrap();
        assert!(seen.borrow().is_empty());
        platform.run();
        assert_eq!(*seen.borrow(), vec![node]);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let platform = FakePlatform::with_body("<button id=\"b\"></button>");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let button = platform.by_id("b");
        let sub = platform.on_click(&button, Rc::new(move || counter.set(counter.get() + 1)));
        platform.click(&button);
        drop(sub);
        platform.click(&button);
        assert_eq!(hits.get(), 1);
    }
}
