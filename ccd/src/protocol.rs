//! INDI XML Protocol definitions
//!
//! Property names used by CCD drivers, outbound command encoding and the
//! inbound message decoder.

use crate::property::{
    NumberElement, NumberVector, Permission, Property, PropertyState, SwitchElement,
    SwitchVector, TextElement, TextVector, UpdateValues, VectorUpdate,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

/// INDI protocol version
pub const INDI_PROTOCOL_VERSION: &str = "1.7";

/// CCD frame type
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CcdFrameType {
    Light,
    Bias,
    Dark,
    Flat,
}

impl CcdFrameType {
    /// Switch element selecting this frame type in `CCD_FRAME_TYPE`
    pub fn element(self) -> &'static str {
        match self {
            CcdFrameType::Light => frame_type_elements::FRAME_LIGHT,
            CcdFrameType::Bias => frame_type_elements::FRAME_BIAS,
            CcdFrameType::Dark => frame_type_elements::FRAME_DARK,
            CcdFrameType::Flat => frame_type_elements::FRAME_FLAT,
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            frame_type_elements::FRAME_LIGHT => Some(CcdFrameType::Light),
            frame_type_elements::FRAME_BIAS => Some(CcdFrameType::Bias),
            frame_type_elements::FRAME_DARK => Some(CcdFrameType::Dark),
            frame_type_elements::FRAME_FLAT => Some(CcdFrameType::Flat),
            _ => None,
        }
    }
}

/// Standard INDI properties
pub mod standard_properties {
    /// Connection control switch
    pub const CONNECTION: &str = "CONNECTION";
    pub const CONNECT: &str = "CONNECT";
    pub const DISCONNECT: &str = "DISCONNECT";

    // Primary sensor
    pub const CCD_FRAME: &str = "CCD_FRAME";
    pub const CCD_EXPOSURE_REQUEST: &str = "CCD_EXPOSURE_REQUEST";
    pub const CCD_ABORT_EXPOSURE: &str = "CCD_ABORT_EXPOSURE";
    pub const CCD_FRAME_TYPE: &str = "CCD_FRAME_TYPE";
    pub const CCD_BINNING: &str = "CCD_BINNING";
    pub const CCD_INFO: &str = "CCD_INFO";
    pub const CCD1: &str = "CCD1"; // BLOB element for primary image data

    // Guide head
    pub const GUIDE_FRAME: &str = "GUIDE_FRAME";
    pub const GUIDER_EXPOSURE_REQUEST: &str = "GUIDER_EXPOSURE_REQUEST";
    pub const GUIDER_ABORT_EXPOSURE: &str = "GUIDER_ABORT_EXPOSURE";
    pub const GUIDER_INFO: &str = "GUIDER_INFO";

    // Video streaming
    pub const VIDEO_STREAM: &str = "VIDEO_STREAM";
}

/// Elements of the frame geometry vectors
pub mod frame_elements {
    pub const X: &str = "X";
    pub const Y: &str = "Y";
    pub const WIDTH: &str = "WIDTH";
    pub const HEIGHT: &str = "HEIGHT";
}

/// Elements of `CCD_BINNING`
pub mod binning_elements {
    pub const HOR_BIN: &str = "HOR_BIN";
    pub const VER_BIN: &str = "VER_BIN";
}

/// Elements of `CCD_FRAME_TYPE`
pub mod frame_type_elements {
    pub const FRAME_LIGHT: &str = "FRAME_LIGHT";
    pub const FRAME_BIAS: &str = "FRAME_BIAS";
    pub const FRAME_DARK: &str = "FRAME_DARK";
    pub const FRAME_FLAT: &str = "FRAME_FLAT";
}

/// Elements of `CCD_INFO` / `GUIDER_INFO`
pub mod info_elements {
    pub const CCD_MAX_X: &str = "CCD_MAX_X";
    pub const CCD_MAX_Y: &str = "CCD_MAX_Y";
}

/// Abort switch element
pub const ABORT: &str = "ABORT";

/// BLOB format tags
pub mod blob_formats {
    pub const FITS: &str = ".fits";
    pub const STREAM: &str = ".stream";
}

/// BLOB delivery policy for `enableBLOB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobMode {
    Never,
    Also,
    Only,
}

impl BlobMode {
    fn as_str(self) -> &'static str {
        match self {
            BlobMode::Never => "Never",
            BlobMode::Also => "Also",
            BlobMode::Only => "Only",
        }
    }
}

/// A binary payload delivered by a `setBLOBVector`
#[derive(Debug, Clone, PartialEq)]
pub struct BlobPayload {
    pub device: String,
    pub property: String,
    /// Element name, e.g. `CCD1`
    pub name: String,
    /// Trailing format tag, e.g. `.fits` or `.stream`
    pub format: String,
    /// Size attribute announced by the driver
    pub size: usize,
    pub data: Vec<u8>,
}

impl BlobPayload {
    pub fn is_fits(&self) -> bool {
        self.format.ends_with(blob_formats::FITS)
    }

    pub fn is_stream(&self) -> bool {
        self.format.ends_with(blob_formats::STREAM)
    }
}

/// Inbound traffic from the INDI server
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `def*Vector`
    Defined(Property),
    /// `set*Vector`
    Updated(VectorUpdate),
    /// `delProperty`; `name` is `None` when the whole device goes away
    Deleted { device: String, name: Option<String> },
    /// One element of a `setBLOBVector`
    Blob(BlobPayload),
    /// Driver `message`
    Message { device: String, message: String },
}

impl InboundEvent {
    pub fn device(&self) -> &str {
        match self {
            InboundEvent::Defined(p) => p.device(),
            InboundEvent::Updated(u) => &u.device,
            InboundEvent::Deleted { device, .. } => device,
            InboundEvent::Blob(b) => &b.device,
            InboundEvent::Message { device, .. } => device,
        }
    }
}

/// Outbound traffic to the INDI server
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
    /// `new*Vector` carrying every element of the vector
    NewVector(Property),
    GetProperties {
        version: String,
        device: Option<String>,
    },
    EnableBlob {
        device: String,
        mode: BlobMode,
    },
}

/// Serialize a command to INDI XML
pub fn encode_command(command: &OutboundCommand) -> String {
    match command {
        OutboundCommand::NewVector(property) => encode_new_vector(property),
        OutboundCommand::GetProperties { version, device } => match device {
            Some(d) => format!(
                "<getProperties version=\"{}\" device=\"{}\"/>",
                escape(version.as_str()),
                escape(d.as_str())
            ),
            None => format!("<getProperties version=\"{}\"/>", escape(version.as_str())),
        },
        OutboundCommand::EnableBlob { device, mode } => format!(
            "<enableBLOB device=\"{}\">{}</enableBLOB>",
            escape(device.as_str()),
            mode.as_str()
        ),
    }
}

fn encode_new_vector(property: &Property) -> String {
    let (tag, elements) = match property {
        Property::Number(v) => (
            "newNumberVector",
            v.elements
                .iter()
                .map(|n| format!("<oneNumber name=\"{}\">{}</oneNumber>", escape(n.name.as_str()), n.value))
                .collect::<String>(),
        ),
        Property::Switch(v) => (
            "newSwitchVector",
            v.elements
                .iter()
                .map(|s| {
                    format!(
                        "<oneSwitch name=\"{}\">{}</oneSwitch>",
                        escape(s.name.as_str()),
                        if s.on { "On" } else { "Off" }
                    )
                })
                .collect::<String>(),
        ),
        Property::Text(v) => (
            "newTextVector",
            v.elements
                .iter()
                .map(|t| {
                    format!(
                        "<oneText name=\"{}\">{}</oneText>",
                        escape(t.name.as_str()),
                        escape(t.value.as_str())
                    )
                })
                .collect::<String>(),
        ),
    };
    format!(
        "<{tag} device=\"{}\" name=\"{}\">{elements}</{tag}>",
        escape(property.device()),
        escape(property.name())
    )
}

/// Parse an INDI number, accepting sexagesimal `D:M:S` notation
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<f64>() {
        return Some(v);
    }
    if !text.contains(':') {
        return None;
    }
    let negative = text.starts_with('-');
    let mut total = 0.0;
    let mut scale = 1.0;
    for part in text.trim_start_matches(['-', '+']).split(':') {
        let v: f64 = part.trim().parse().ok()?;
        total += v / scale;
        scale *= 60.0;
    }
    Some(if negative { -total } else { total })
}

/// Attributes captured from an element start tag
#[derive(Debug, Default)]
struct ElementStart {
    name: String,
    label: Option<String>,
    min: f64,
    max: f64,
    step: f64,
    format: Option<String>,
    size: usize,
}

#[derive(Debug)]
enum Pending {
    Define(Property),
    Update(VectorUpdate),
    Blob {
        device: String,
        property: String,
        payloads: Vec<BlobPayload>,
    },
    Delete {
        device: String,
        name: Option<String>,
    },
    Message {
        device: String,
        message: String,
    },
}

/// Incremental decoder turning quick-xml events into [`InboundEvent`]s
///
/// Unsupported vectors (lights, BLOB definitions) are skipped.
#[derive(Debug, Default)]
pub struct MessageDecoder {
    pending: Option<Pending>,
    element: Option<ElementStart>,
    text: String,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message is partially decoded
    pub fn in_message(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any partially decoded message
    pub fn reset(&mut self) {
        self.pending = None;
        self.element = None;
        self.text.clear();
    }

    /// Feed one XML event, returning any messages it completed
    pub fn feed(&mut self, event: Event<'_>) -> Vec<InboundEvent> {
        match event {
            Event::Start(e) => {
                self.start(&e);
                Vec::new()
            }
            Event::Empty(e) => {
                self.start(&e);
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                self.end(&tag)
            }
            Event::Text(t) => {
                if self.element.is_some() {
                    self.text.push_str(&t.unescape().unwrap_or_default());
                }
                Vec::new()
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                self.end(&tag)
            }
            _ => Vec::new(),
        }
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let device = attribute(e, "device").unwrap_or_default();
        let name = attribute(e, "name").unwrap_or_default();

        match tag.as_str() {
            "defNumberVector" | "defSwitchVector" | "defTextVector" => {
                let label = attribute(e, "label").unwrap_or_else(|| name.clone());
                let group = attribute(e, "group").unwrap_or_default();
                let state = PropertyState::parse(&attribute(e, "state").unwrap_or_default());
                let perm = Permission::parse(&attribute(e, "perm").unwrap_or_default());
                let property = match tag.as_str() {
                    "defNumberVector" => Property::Number(NumberVector {
                        device,
                        name,
                        label,
                        group,
                        state,
                        perm,
                        elements: Vec::new(),
                    }),
                    "defSwitchVector" => Property::Switch(SwitchVector {
                        device,
                        name,
                        label,
                        group,
                        state,
                        perm,
                        elements: Vec::new(),
                    }),
                    _ => Property::Text(TextVector {
                        device,
                        name,
                        label,
                        group,
                        state,
                        perm,
                        elements: Vec::new(),
                    }),
                };
                self.pending = Some(Pending::Define(property));
            }
            "setNumberVector" | "setSwitchVector" | "setTextVector" => {
                let values = match tag.as_str() {
                    "setNumberVector" => UpdateValues::Number(Vec::new()),
                    "setSwitchVector" => UpdateValues::Switch(Vec::new()),
                    _ => UpdateValues::Text(Vec::new()),
                };
                self.pending = Some(Pending::Update(VectorUpdate {
                    device,
                    name,
                    state: attribute(e, "state").map(|s| PropertyState::parse(&s)),
                    values,
                }));
            }
            "setBLOBVector" => {
                self.pending = Some(Pending::Blob {
                    device,
                    property: name,
                    payloads: Vec::new(),
                });
            }
            "delProperty" => {
                self.pending = Some(Pending::Delete {
                    device,
                    name: if name.is_empty() { None } else { Some(name) },
                });
            }
            "message" => {
                self.pending = Some(Pending::Message {
                    device,
                    message: attribute(e, "message").unwrap_or_default(),
                });
            }
            "defNumber" | "defSwitch" | "defText" | "oneNumber" | "oneSwitch" | "oneText"
            | "oneBLOB" => {
                if self.pending.is_none() {
                    return;
                }
                let number = |key: &str| {
                    attribute(e, key)
                        .and_then(|s| parse_number(&s))
                        .unwrap_or(0.0)
                };
                self.element = Some(ElementStart {
                    name,
                    label: attribute(e, "label"),
                    min: number("min"),
                    max: number("max"),
                    step: number("step"),
                    format: attribute(e, "format"),
                    size: attribute(e, "size")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0),
                });
                self.text.clear();
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: &str) -> Vec<InboundEvent> {
        match tag {
            "defNumber" | "defSwitch" | "defText" | "oneNumber" | "oneSwitch" | "oneText"
            | "oneBLOB" => {
                if let Some(element) = self.element.take() {
                    let text = std::mem::take(&mut self.text);
                    self.finish_element(tag, element, text);
                }
                Vec::new()
            }
            "defNumberVector" | "defSwitchVector" | "defTextVector" | "setNumberVector"
            | "setSwitchVector" | "setTextVector" | "setBLOBVector" | "delProperty"
            | "message" => {
                self.element = None;
                match self.pending.take() {
                    Some(Pending::Define(p)) => vec![InboundEvent::Defined(p)],
                    Some(Pending::Update(u)) => vec![InboundEvent::Updated(u)],
                    Some(Pending::Blob { payloads, .. }) => {
                        payloads.into_iter().map(InboundEvent::Blob).collect()
                    }
                    Some(Pending::Delete { device, name }) => {
                        vec![InboundEvent::Deleted { device, name }]
                    }
                    Some(Pending::Message { device, message }) => {
                        vec![InboundEvent::Message { device, message }]
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn finish_element(&mut self, tag: &str, element: ElementStart, text: String) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let label = element.label.clone().unwrap_or_else(|| element.name.clone());

        match (pending, tag) {
            (Pending::Define(Property::Number(v)), "defNumber") => {
                let Some(value) = parse_number(&text) else {
                    tracing::warn!("Invalid number '{}' for {}.{}", text, v.name, element.name);
                    return;
                };
                v.elements.push(NumberElement {
                    name: element.name,
                    label,
                    value,
                    min: element.min,
                    max: element.max,
                    step: element.step,
                    format: element.format.unwrap_or_else(|| "%g".to_string()),
                });
            }
            (Pending::Define(Property::Switch(v)), "defSwitch") => {
                v.elements.push(SwitchElement {
                    name: element.name,
                    label,
                    on: text.trim().eq_ignore_ascii_case("on"),
                });
            }
            (Pending::Define(Property::Text(v)), "defText") => {
                v.elements.push(TextElement {
                    name: element.name,
                    label,
                    value: text,
                });
            }
            (Pending::Update(u), "oneNumber") => {
                if let UpdateValues::Number(values) = &mut u.values {
                    match parse_number(&text) {
                        Some(value) => values.push((element.name, value)),
                        None => tracing::warn!(
                            "Invalid number '{}' for {}.{}",
                            text,
                            u.name,
                            element.name
                        ),
                    }
                }
            }
            (Pending::Update(u), "oneSwitch") => {
                if let UpdateValues::Switch(values) = &mut u.values {
                    values.push((element.name, text.trim().eq_ignore_ascii_case("on")));
                }
            }
            (Pending::Update(u), "oneText") => {
                if let UpdateValues::Text(values) = &mut u.values {
                    values.push((element.name, text));
                }
            }
            (
                Pending::Blob {
                    device,
                    property,
                    payloads,
                },
                "oneBLOB",
            ) => {
                let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                match BASE64.decode(cleaned.as_bytes()) {
                    Ok(data) => {
                        tracing::debug!(
                            "BLOB received for {}.{}.{}: {} bytes",
                            device,
                            property,
                            element.name,
                            data.len()
                        );
                        payloads.push(BlobPayload {
                            device: device.clone(),
                            property: property.clone(),
                            name: element.name,
                            format: element.format.unwrap_or_default(),
                            size: element.size,
                            data,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to decode BLOB base64 for {}.{}.{}: {}",
                            device,
                            property,
                            element.name,
                            e
                        );
                    }
                }
            }
            (_, other) => {
                tracing::debug!("Ignoring <{}> outside a matching vector", other);
            }
        }
    }
}

/// Decode a complete XML document (or concatenated messages) in one pass
pub fn decode_str(xml: &str) -> Vec<InboundEvent> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.trim_text(true);
    let mut decoder = MessageDecoder::new();
    let mut events = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => events.extend(decoder.feed(event)),
            Err(e) => {
                tracing::error!("INDI XML parse error: {}", e);
                break;
            }
        }
    }
    events
}

/// Helper to get attribute from XML event
fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name.as_bytes())
        .map(|a| match a.unescape_value() {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(&a.value).to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_number_definition() {
        let xml = r#"
            <defNumberVector device="CCD Simulator" name="CCD_BINNING" label="Binning" group="Image Settings" state="Idle" perm="rw">
                <defNumber name="HOR_BIN" label="X" format="%2.0f" min="1" max="4" step="1">1</defNumber>
                <defNumber name="VER_BIN" label="Y" format="%2.0f" min="1" max="4" step="1">1</defNumber>
            </defNumberVector>"#;

        let events = decode_str(xml);
        assert_eq!(events.len(), 1);
        let InboundEvent::Defined(Property::Number(v)) = &events[0] else {
            panic!("expected number definition, got {:?}", events[0]);
        };
        assert_eq!(v.device, "CCD Simulator");
        assert_eq!(v.name, "CCD_BINNING");
        assert_eq!(v.group, "Image Settings");
        assert_eq!(v.elements.len(), 2);
        let hor = v.find("HOR_BIN").unwrap();
        assert_eq!(hor.max, 4.0);
        assert_eq!(hor.min, 1.0);
        assert_eq!(hor.label, "X");
        assert_eq!(hor.format, "%2.0f");
    }

    #[test]
    fn test_decode_switch_update() {
        let xml = r#"<setSwitchVector device="CCD Simulator" name="CONNECTION" state="Ok">
                <oneSwitch name="CONNECT">Off</oneSwitch>
                <oneSwitch name="DISCONNECT">On</oneSwitch>
            </setSwitchVector>"#;

        let events = decode_str(xml);
        assert_eq!(
            events,
            vec![InboundEvent::Updated(VectorUpdate {
                device: "CCD Simulator".to_string(),
                name: "CONNECTION".to_string(),
                state: Some(PropertyState::Ok),
                values: UpdateValues::Switch(vec![
                    ("CONNECT".to_string(), false),
                    ("DISCONNECT".to_string(), true),
                ]),
            })]
        );
    }

    #[test]
    fn test_decode_blob() {
        let data = b"SIMPLE  =                    T";
        let encoded = BASE64.encode(data);
        let (head, tail) = encoded.split_at(10);
        let xml = format!(
            "<setBLOBVector device=\"CCD Simulator\" name=\"CCD1\" state=\"Ok\">\
             <oneBLOB name=\"CCD1\" size=\"{}\" format=\".fits\">{}\n{}</oneBLOB>\
             </setBLOBVector>",
            data.len(),
            head,
            tail
        );

        let events = decode_str(&xml);
        assert_eq!(events.len(), 1);
        let InboundEvent::Blob(blob) = &events[0] else {
            panic!("expected blob, got {:?}", events[0]);
        };
        assert_eq!(blob.name, "CCD1");
        assert_eq!(blob.property, "CCD1");
        assert_eq!(blob.size, data.len());
        assert!(blob.is_fits());
        assert!(!blob.is_stream());
        assert_eq!(blob.data, data.to_vec());
    }

    #[test]
    fn test_decode_delete_and_message() {
        let xml = r#"<delProperty device="CCD Simulator" name="CCD_FRAME"/>
            <delProperty device="CCD Simulator"/>
            <message device="CCD Simulator" message="Exposure done"/>"#;

        let events = decode_str(xml);
        assert_eq!(
            events,
            vec![
                InboundEvent::Deleted {
                    device: "CCD Simulator".to_string(),
                    name: Some("CCD_FRAME".to_string()),
                },
                InboundEvent::Deleted {
                    device: "CCD Simulator".to_string(),
                    name: None,
                },
                InboundEvent::Message {
                    device: "CCD Simulator".to_string(),
                    message: "Exposure done".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_light_vectors_are_skipped() {
        let xml = r#"<defLightVector device="CCD Simulator" name="STATUS" state="Idle">
                <defLight name="BUSY">Idle</defLight>
            </defLightVector>
            <defTextVector device="CCD Simulator" name="DRIVER_INFO" perm="ro">
                <defText name="DRIVER_NAME">CCD &amp; Guider</defText>
            </defTextVector>"#;

        let events = decode_str(xml);
        assert_eq!(events.len(), 1);
        let InboundEvent::Defined(Property::Text(v)) = &events[0] else {
            panic!("expected text definition");
        };
        assert_eq!(v.perm, Permission::ReadOnly);
        assert_eq!(v.find("DRIVER_NAME").unwrap().value, "CCD & Guider");
    }

    #[test]
    fn test_encode_new_number_vector() {
        let v = NumberVector::new("CCD Simulator", "CCD_BINNING")
            .with_element(NumberElement::new("HOR_BIN", 2.0, 1.0, 4.0))
            .with_element(NumberElement::new("VER_BIN", 2.0, 1.0, 4.0));
        let xml = encode_command(&OutboundCommand::NewVector(Property::Number(v)));
        assert_eq!(
            xml,
            "<newNumberVector device=\"CCD Simulator\" name=\"CCD_BINNING\">\
             <oneNumber name=\"HOR_BIN\">2</oneNumber>\
             <oneNumber name=\"VER_BIN\">2</oneNumber>\
             </newNumberVector>"
        );
    }

    #[test]
    fn test_encode_switch_and_control_commands() {
        let v = SwitchVector::new("CCD Simulator", "CCD_FRAME_TYPE")
            .with_element(SwitchElement::new("FRAME_LIGHT", false))
            .with_element(SwitchElement::new("FRAME_DARK", true));
        let xml = encode_command(&OutboundCommand::NewVector(Property::Switch(v)));
        assert!(xml.starts_with("<newSwitchVector device=\"CCD Simulator\" name=\"CCD_FRAME_TYPE\">"));
        assert!(xml.contains("<oneSwitch name=\"FRAME_LIGHT\">Off</oneSwitch>"));
        assert!(xml.contains("<oneSwitch name=\"FRAME_DARK\">On</oneSwitch>"));

        let xml = encode_command(&OutboundCommand::GetProperties {
            version: INDI_PROTOCOL_VERSION.to_string(),
            device: None,
        });
        assert_eq!(xml, "<getProperties version=\"1.7\"/>");

        let xml = encode_command(&OutboundCommand::EnableBlob {
            device: "CCD Simulator".to_string(),
            mode: BlobMode::Also,
        });
        assert_eq!(xml, "<enableBLOB device=\"CCD Simulator\">Also</enableBLOB>");
    }

    #[test]
    fn test_encode_escapes_text() {
        let v = TextVector::new("CCD Simulator", "UPLOAD_SETTINGS")
            .with_element(TextElement::new("UPLOAD_PREFIX", "M31<&>"));
        let xml = encode_command(&OutboundCommand::NewVector(Property::Text(v)));
        assert!(xml.contains("M31&lt;&amp;&gt;"));
    }

    #[test]
    fn test_parse_number_sexagesimal() {
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("12:30:00"), Some(12.5));
        assert_eq!(parse_number("-10:30"), Some(-10.5));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_frame_type_elements() {
        for t in [
            CcdFrameType::Light,
            CcdFrameType::Bias,
            CcdFrameType::Dark,
            CcdFrameType::Flat,
        ] {
            assert_eq!(CcdFrameType::from_element(t.element()), Some(t));
        }
        assert_eq!(CcdFrameType::from_element("FRAME_OTHER"), None);
    }
}
