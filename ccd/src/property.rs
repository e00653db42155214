//! Device property store
//!
//! Holds the named vector properties (number, switch, text) announced by one
//! INDI device. Lookups are by exact name; absence is reported as `None`.

use std::collections::HashMap;

/// INDI property state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    pub fn parse(s: &str) -> Self {
        match s {
            "Ok" => PropertyState::Ok,
            "Busy" => PropertyState::Busy,
            "Alert" => PropertyState::Alert,
            _ => PropertyState::Idle,
        }
    }
}

/// INDI property permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl Permission {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ro" => Permission::ReadOnly,
            "wo" => Permission::WriteOnly,
            _ => Permission::ReadWrite,
        }
    }

    pub fn is_writable(self) -> bool {
        self != Permission::ReadOnly
    }
}

/// Vector kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Number,
    Switch,
    Text,
}

/// Anything stored inside a vector property
pub trait Element {
    fn name(&self) -> &str;
}

/// A number element with its declared bounds
#[derive(Debug, Clone, PartialEq)]
pub struct NumberElement {
    pub name: String,
    pub label: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub format: String,
}

impl NumberElement {
    pub fn new(name: &str, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            value,
            min,
            max,
            step: 0.0,
            format: "%g".to_string(),
        }
    }

    /// Whether `value` lies inside [min, max].
    ///
    /// INDI drivers declare `min == max` (usually both zero) for unbounded
    /// numbers, so an empty range accepts everything.
    pub fn in_bounds(&self, value: f64) -> bool {
        if self.max <= self.min {
            return true;
        }
        value >= self.min && value <= self.max
    }
}

impl Element for NumberElement {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A switch element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchElement {
    pub name: String,
    pub label: String,
    pub on: bool,
}

impl SwitchElement {
    pub fn new(name: &str, on: bool) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            on,
        }
    }
}

impl Element for SwitchElement {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A text element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextElement {
    pub name: String,
    pub label: String,
    pub value: String,
}

impl TextElement {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl Element for TextElement {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A named, ordered set of like-typed elements
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<E> {
    pub device: String,
    pub name: String,
    pub label: String,
    pub group: String,
    pub state: PropertyState,
    pub perm: Permission,
    pub elements: Vec<E>,
}

impl<E: Element> Vector<E> {
    pub fn new(device: &str, name: &str) -> Self {
        Self {
            device: device.to_string(),
            name: name.to_string(),
            label: name.to_string(),
            group: String::new(),
            state: PropertyState::Idle,
            perm: Permission::ReadWrite,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: E) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_perm(mut self, perm: Permission) -> Self {
        self.perm = perm;
        self
    }

    /// Find an element by exact name
    pub fn find(&self, name: &str) -> Option<&E> {
        self.elements.iter().find(|e| e.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut E> {
        self.elements.iter_mut().find(|e| e.name() == name)
    }
}

pub type NumberVector = Vector<NumberElement>;
pub type SwitchVector = Vector<SwitchElement>;
pub type TextVector = Vector<TextElement>;

impl NumberVector {
    /// Current value of a named element
    pub fn value(&self, name: &str) -> Option<f64> {
        self.find(name).map(|n| n.value)
    }
}

impl SwitchVector {
    /// Turn every switch off
    pub fn reset(&mut self) {
        for s in &mut self.elements {
            s.on = false;
        }
    }

    /// First switch that is on
    pub fn active(&self) -> Option<&SwitchElement> {
        self.elements.iter().find(|s| s.on)
    }

    pub fn is_on(&self, name: &str) -> bool {
        self.find(name).map(|s| s.on).unwrap_or(false)
    }
}

/// A device property
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Number(NumberVector),
    Switch(SwitchVector),
    Text(TextVector),
}

impl Property {
    pub fn name(&self) -> &str {
        match self {
            Property::Number(v) => &v.name,
            Property::Switch(v) => &v.name,
            Property::Text(v) => &v.name,
        }
    }

    pub fn device(&self) -> &str {
        match self {
            Property::Number(v) => &v.device,
            Property::Switch(v) => &v.device,
            Property::Text(v) => &v.device,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Property::Number(_) => PropertyKind::Number,
            Property::Switch(_) => PropertyKind::Switch,
            Property::Text(_) => PropertyKind::Text,
        }
    }

    pub fn state(&self) -> PropertyState {
        match self {
            Property::Number(v) => v.state,
            Property::Switch(v) => v.state,
            Property::Text(v) => v.state,
        }
    }

    pub fn perm(&self) -> Permission {
        match self {
            Property::Number(v) => v.perm,
            Property::Switch(v) => v.perm,
            Property::Text(v) => v.perm,
        }
    }

    fn set_state(&mut self, state: PropertyState) {
        match self {
            Property::Number(v) => v.state = state,
            Property::Switch(v) => v.state = state,
            Property::Text(v) => v.state = state,
        }
    }
}

/// Values carried by a `set*Vector` message
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValues {
    Number(Vec<(String, f64)>),
    Switch(Vec<(String, bool)>),
    Text(Vec<(String, String)>),
}

impl UpdateValues {
    pub fn kind(&self) -> PropertyKind {
        match self {
            UpdateValues::Number(_) => PropertyKind::Number,
            UpdateValues::Switch(_) => PropertyKind::Switch,
            UpdateValues::Text(_) => PropertyKind::Text,
        }
    }
}

/// An inbound update to an already defined vector
#[derive(Debug, Clone, PartialEq)]
pub struct VectorUpdate {
    pub device: String,
    pub name: String,
    pub state: Option<PropertyState>,
    pub values: UpdateValues,
}

/// Named properties of one device
#[derive(Debug, Default)]
pub struct PropertyStore {
    device: String,
    properties: HashMap<String, Property>,
}

impl PropertyStore {
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Insert or replace a property definition
    pub fn define(&mut self, property: Property) {
        self.properties.insert(property.name().to_string(), property);
    }

    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    pub fn clear(&mut self) {
        self.properties.clear();
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.get_mut(name)
    }

    pub fn number(&self, name: &str) -> Option<&NumberVector> {
        match self.properties.get(name) {
            Some(Property::Number(v)) => Some(v),
            _ => None,
        }
    }

    pub fn number_mut(&mut self, name: &str) -> Option<&mut NumberVector> {
        match self.properties.get_mut(name) {
            Some(Property::Number(v)) => Some(v),
            _ => None,
        }
    }

    pub fn switch(&self, name: &str) -> Option<&SwitchVector> {
        match self.properties.get(name) {
            Some(Property::Switch(v)) => Some(v),
            _ => None,
        }
    }

    pub fn switch_mut(&mut self, name: &str) -> Option<&mut SwitchVector> {
        match self.properties.get_mut(name) {
            Some(Property::Switch(v)) => Some(v),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&TextVector> {
        match self.properties.get(name) {
            Some(Property::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, name: &str) -> Option<&mut TextVector> {
        match self.properties.get_mut(name) {
            Some(Property::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Merge an inbound update into the stored vector.
    ///
    /// Returns false when the property is unknown or of another kind.
    /// Element names the vector does not declare are skipped.
    pub fn apply(&mut self, update: &VectorUpdate) -> bool {
        let Some(property) = self.properties.get_mut(&update.name) else {
            return false;
        };
        if property.kind() != update.values.kind() {
            tracing::warn!(
                "Update for {}.{} has kind {:?}, stored property is {:?}",
                update.device,
                update.name,
                update.values.kind(),
                property.kind()
            );
            return false;
        }

        if let Some(state) = update.state {
            property.set_state(state);
        }

        match (property, &update.values) {
            (Property::Number(v), UpdateValues::Number(values)) => {
                for (name, value) in values {
                    if let Some(n) = v.find_mut(name) {
                        n.value = *value;
                    }
                }
            }
            (Property::Switch(v), UpdateValues::Switch(values)) => {
                for (name, on) in values {
                    if let Some(s) = v.find_mut(name) {
                        s.on = *on;
                    }
                }
            }
            (Property::Text(v), UpdateValues::Text(values)) => {
                for (name, value) in values {
                    if let Some(t) = v.find_mut(name) {
                        t.value.clone_from(value);
                    }
                }
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_vector() -> NumberVector {
        NumberVector::new("CCD Simulator", "CCD_FRAME")
            .with_element(NumberElement::new("X", 0.0, 0.0, 1280.0))
            .with_element(NumberElement::new("Y", 0.0, 0.0, 1024.0))
            .with_element(NumberElement::new("WIDTH", 1280.0, 1.0, 1280.0))
            .with_element(NumberElement::new("HEIGHT", 1024.0, 1.0, 1024.0))
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut store = PropertyStore::new("CCD Simulator");
        store.define(Property::Number(frame_vector()));

        assert!(store.number("CCD_FRAME").is_some());
        assert!(store.number("CCD_FRAM").is_none());
        assert!(store.number("ccd_frame").is_none());
        assert!(store.switch("CCD_FRAME").is_none());

        let frame = store.number("CCD_FRAME").unwrap();
        assert_eq!(frame.value("WIDTH"), Some(1280.0));
        assert!(frame.find("W").is_none());
    }

    #[test]
    fn test_apply_number_update() {
        let mut store = PropertyStore::new("CCD Simulator");
        store.define(Property::Number(frame_vector()));

        let applied = store.apply(&VectorUpdate {
            device: "CCD Simulator".to_string(),
            name: "CCD_FRAME".to_string(),
            state: Some(PropertyState::Ok),
            values: UpdateValues::Number(vec![
                ("WIDTH".to_string(), 640.0),
                ("BOGUS".to_string(), 1.0),
            ]),
        });

        assert!(applied);
        let frame = store.number("CCD_FRAME").unwrap();
        assert_eq!(frame.value("WIDTH"), Some(640.0));
        assert_eq!(frame.value("HEIGHT"), Some(1024.0));
        assert_eq!(frame.state, PropertyState::Ok);
    }

    #[test]
    fn test_apply_rejects_unknown_or_mismatched() {
        let mut store = PropertyStore::new("CCD Simulator");
        store.define(Property::Number(frame_vector()));

        let unknown = VectorUpdate {
            device: "CCD Simulator".to_string(),
            name: "CCD_TEMPERATURE".to_string(),
            state: None,
            values: UpdateValues::Number(vec![]),
        };
        assert!(!store.apply(&unknown));

        let mismatched = VectorUpdate {
            device: "CCD Simulator".to_string(),
            name: "CCD_FRAME".to_string(),
            state: Some(PropertyState::Alert),
            values: UpdateValues::Switch(vec![("X".to_string(), true)]),
        };
        assert!(!store.apply(&mismatched));
        assert_eq!(store.get("CCD_FRAME").unwrap().state(), PropertyState::Idle);
    }

    #[test]
    fn test_switch_reset_and_active() {
        let mut v = SwitchVector::new("CCD Simulator", "CCD_FRAME_TYPE")
            .with_element(SwitchElement::new("FRAME_LIGHT", true))
            .with_element(SwitchElement::new("FRAME_DARK", false));
        assert_eq!(v.active().map(|s| s.name.as_str()), Some("FRAME_LIGHT"));

        v.reset();
        assert!(v.active().is_none());
        assert!(!v.is_on("FRAME_LIGHT"));
    }

    #[test]
    fn test_number_bounds() {
        let n = NumberElement::new("HOR_BIN", 1.0, 1.0, 4.0);
        assert!(n.in_bounds(1.0));
        assert!(n.in_bounds(4.0));
        assert!(!n.in_bounds(5.0));
        assert!(!n.in_bounds(0.0));

        let unbounded = NumberElement::new("CCD_EXPOSURE_VALUE", 1.0, 0.0, 0.0);
        assert!(unbounded.in_bounds(3600.0));
    }

    #[test]
    fn test_remove_and_names() {
        let mut store = PropertyStore::new("CCD Simulator");
        store.define(Property::Number(frame_vector()));
        store.define(Property::Text(
            TextVector::new("CCD Simulator", "DRIVER_INFO")
                .with_element(TextElement::new("DRIVER_NAME", "CCD Simulator")),
        ));
        assert_eq!(store.len(), 2);

        let mut names: Vec<&str> = store.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["CCD_FRAME", "DRIVER_INFO"]);

        assert!(store.remove("CCD_FRAME").is_some());
        assert!(!store.contains("CCD_FRAME"));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(Permission::parse("ro"), Permission::ReadOnly);
        assert_eq!(Permission::parse("WO"), Permission::WriteOnly);
        assert_eq!(Permission::parse("rw"), Permission::ReadWrite);
        assert!(!Permission::ReadOnly.is_writable());
        assert_eq!(PropertyState::parse("Busy"), PropertyState::Busy);
        assert_eq!(PropertyState::parse("garbage"), PropertyState::Idle);
    }
}
