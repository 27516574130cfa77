//! Notification to OSC message translation
//!
//! Every event maps to one `/Kontrol/...` address whose arguments carry the
//! identifiers (rack, module, page, parameter) and value a receiver needs to
//! apply the change without further queries.

use kontrol_model::{Module, Notification, ParamValue, Parameter, Rack};

use crate::error::EncodeError;
use crate::frame::{Frame, FrameBatch, MAX_N_OSC_MSGS};
use crate::osc::{encode_message, Arg};

pub const ADDR_RACK: &str = "/Kontrol/rack";
pub const ADDR_MODULE: &str = "/Kontrol/module";
pub const ADDR_PAGE: &str = "/Kontrol/page";
pub const ADDR_PARAM: &str = "/Kontrol/param";
pub const ADDR_CHANGED: &str = "/Kontrol/changed";
pub const ADDR_RESOURCE: &str = "/Kontrol/resource";
pub const ADDR_DELETE_RACK: &str = "/Kontrol/deleteRack";
pub const ADDR_ACTIVE_MODULE: &str = "/Kontrol/activeModule";
pub const ADDR_PING: &str = "/Kontrol/ping";
pub const ADDR_ASSIGN_MIDI_CC: &str = "/Kontrol/assignMidiCC";
pub const ADDR_UNASSIGN_MIDI_CC: &str = "/Kontrol/unassignMidiCC";
pub const ADDR_ASSIGN_MODULATION: &str = "/Kontrol/assignModulation";
pub const ADDR_UNASSIGN_MODULATION: &str = "/Kontrol/unassignModulation";
pub const ADDR_SAVE_PRESET: &str = "/Kontrol/savePreset";
pub const ADDR_LOAD_PRESET: &str = "/Kontrol/loadPreset";
pub const ADDR_SAVE_SETTINGS: &str = "/Kontrol/saveSettings";
pub const ADDR_LOAD_MODULE: &str = "/Kontrol/loadModule";
pub const ADDR_MIDI_LEARN: &str = "/Kontrol/midiLearn";
pub const ADDR_MODULATION_LEARN: &str = "/Kontrol/modulationLearn";
pub const ADDR_PUBLISH_START: &str = "/Kontrol/publishStart";
pub const ADDR_PUBLISH_RACK_FINISHED: &str = "/Kontrol/publishRackFinished";

fn value_arg(value: &ParamValue) -> Arg<'_> {
    match value {
        ParamValue::Float(v) => Arg::Float(*v),
        ParamValue::Str(s) => Arg::Str(s),
    }
}

/// Wire-facing u32 values are sent as OSC int32, saturating at `i32::MAX`
fn int_arg(v: u32) -> Arg<'static> {
    Arg::Int(i32::try_from(v).unwrap_or(i32::MAX))
}

fn param_binding(
    address: &str,
    rack: &Rack,
    module: &Module,
    param: &Parameter,
    value: u32,
) -> Result<Frame, EncodeError> {
    encode_message(
        address,
        &[
            Arg::Str(rack.id.as_str()),
            Arg::Str(module.id.as_str()),
            Arg::Str(param.id.as_str()),
            int_arg(value),
        ],
    )
}

fn encode_rack(rack: &Rack) -> Result<Frame, EncodeError> {
    encode_message(
        ADDR_RACK,
        &[
            Arg::Str(rack.id.as_str()),
            Arg::Str(&rack.host),
            Arg::Int(i32::from(rack.port)),
        ],
    )
}

fn encode_param(rack: &Rack, module: &Module, param: &Parameter) -> Result<Frame, EncodeError> {
    let mut args = Vec::with_capacity(6 + param.attributes.len());
    args.push(Arg::Str(rack.id.as_str()));
    args.push(Arg::Str(module.id.as_str()));
    args.push(Arg::Str(&param.param_type));
    args.push(Arg::Str(param.id.as_str()));
    args.push(Arg::Str(&param.display_name));
    args.extend(param.attributes.iter().map(value_arg));
    args.push(value_arg(&param.current));
    encode_message(ADDR_PARAM, &args)
}

/// Encode a single notification.
///
/// `Ping` is an inbound liveness observation and produces no frames.
pub fn encode(event: &Notification<'_>) -> Result<FrameBatch, EncodeError> {
    let frame = match *event {
        Notification::Rack { rack } => encode_rack(rack)?,
        Notification::Module { rack, module } => encode_message(
            ADDR_MODULE,
            &[
                Arg::Str(rack.id.as_str()),
                Arg::Str(module.id.as_str()),
                Arg::Str(&module.display_name),
                Arg::Str(&module.module_type),
            ],
        )?,
        Notification::Page { rack, module, page } => {
            let mut args = Vec::with_capacity(4 + page.param_ids.len());
            args.push(Arg::Str(rack.id.as_str()));
            args.push(Arg::Str(module.id.as_str()));
            args.push(Arg::Str(page.id.as_str()));
            args.push(Arg::Str(&page.display_name));
            args.extend(page.param_ids.iter().map(|id| Arg::Str(id.as_str())));
            encode_message(ADDR_PAGE, &args)?
        }
        Notification::Param { rack, module, param } => encode_param(rack, module, param)?,
        Notification::Changed { rack, module, param } => encode_message(
            ADDR_CHANGED,
            &[
                Arg::Str(rack.id.as_str()),
                Arg::Str(module.id.as_str()),
                Arg::Str(param.id.as_str()),
                value_arg(&param.current),
            ],
        )?,
        Notification::Resource { rack, res_type, resource } => encode_message(
            ADDR_RESOURCE,
            &[Arg::Str(rack.id.as_str()), Arg::Str(res_type), Arg::Str(resource)],
        )?,
        Notification::DeleteRack { rack } => {
            encode_message(ADDR_DELETE_RACK, &[Arg::Str(rack.id.as_str())])?
        }
        Notification::ActiveModule { rack, module } => encode_message(
            ADDR_ACTIVE_MODULE,
            &[Arg::Str(rack.id.as_str()), Arg::Str(module.id.as_str())],
        )?,
        Notification::Ping { .. } => return Ok(FrameBatch::new()),
        Notification::AssignMidiCc { rack, module, param, midi_cc } => {
            param_binding(ADDR_ASSIGN_MIDI_CC, rack, module, param, midi_cc)?
        }
        Notification::UnassignMidiCc { rack, module, param, midi_cc } => {
            param_binding(ADDR_UNASSIGN_MIDI_CC, rack, module, param, midi_cc)?
        }
        Notification::AssignModulation { rack, module, param, bus } => {
            param_binding(ADDR_ASSIGN_MODULATION, rack, module, param, bus)?
        }
        Notification::UnassignModulation { rack, module, param, bus } => {
            param_binding(ADDR_UNASSIGN_MODULATION, rack, module, param, bus)?
        }
        Notification::SavePreset { rack, preset } => encode_message(
            ADDR_SAVE_PRESET,
            &[Arg::Str(rack.id.as_str()), Arg::Str(preset)],
        )?,
        Notification::LoadPreset { rack, preset } => encode_message(
            ADDR_LOAD_PRESET,
            &[Arg::Str(rack.id.as_str()), Arg::Str(preset)],
        )?,
        Notification::SaveSettings { rack } => {
            encode_message(ADDR_SAVE_SETTINGS, &[Arg::Str(rack.id.as_str())])?
        }
        Notification::LoadModule { rack, module_id, module_type } => encode_message(
            ADDR_LOAD_MODULE,
            &[
                Arg::Str(rack.id.as_str()),
                Arg::Str(module_id.as_str()),
                Arg::Str(module_type),
            ],
        )?,
        Notification::MidiLearn { enabled } => {
            encode_message(ADDR_MIDI_LEARN, &[Arg::Bool(enabled)])?
        }
        Notification::ModulationLearn { enabled } => {
            encode_message(ADDR_MODULATION_LEARN, &[Arg::Bool(enabled)])?
        }
        Notification::PublishStart { num_racks } => {
            encode_message(ADDR_PUBLISH_START, &[int_arg(num_racks)])?
        }
        Notification::PublishRackFinished { rack } => {
            encode_message(ADDR_PUBLISH_RACK_FINISHED, &[Arg::Str(rack.id.as_str())])?
        }
    };
    Ok(FrameBatch::single(frame))
}

/// Liveness announcement: the port peers should answer on, and our keep-alive
pub fn encode_ping(port: u16, keep_alive_ms: u32) -> Result<Frame, EncodeError> {
    encode_message(ADDR_PING, &[Arg::Int(i32::from(port)), int_arg(keep_alive_ms)])
}

/// Number of frames a publish of `num_racks` racks takes
pub fn publish_frame_count(num_racks: usize) -> usize {
    1 + 2 * num_racks
}

/// Publish several racks as one batch: `publishStart`, then `rack` and
/// `publishRackFinished` for each rack.
///
/// Fails with [`EncodeError::BatchOverflow`] before encoding anything if the
/// batch would not fit in [`MAX_N_OSC_MSGS`] frames.
pub fn encode_publish(racks: &[Rack]) -> Result<FrameBatch, EncodeError> {
    let needed = publish_frame_count(racks.len());
    if needed > MAX_N_OSC_MSGS {
        return Err(EncodeError::BatchOverflow {
            needed,
            capacity: MAX_N_OSC_MSGS,
        });
    }

    let mut batch = FrameBatch::new();
    batch.push(encode_message(ADDR_PUBLISH_START, &[Arg::Int(racks.len() as i32)])?)?;
    for rack in racks {
        batch.push(encode_rack(rack)?)?;
        batch.push(encode_message(ADDR_PUBLISH_RACK_FINISHED, &[Arg::Str(rack.id.as_str())])?)?;
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MAX_OSC_MESSAGE_SIZE;
    use crate::osc::{OscArg, OscMessage};
    use kontrol_model::{EntityId, Page};

    fn fixtures() -> (Rack, Module, Parameter) {
        (
            Rack::new("rack-1", "192.168.1.20", 6000),
            Module::new("m1", "Reverb", "mec.reverb"),
            Parameter::new("mix", "Mix", "pct", ParamValue::Float(0.5))
                .with_attributes(vec![ParamValue::Float(0.0), ParamValue::Float(1.0)]),
        )
    }

    fn decode_single(batch: FrameBatch) -> OscMessage {
        assert_eq!(batch.len(), 1);
        OscMessage::decode(batch.frames()[0].as_bytes()).unwrap()
    }

    #[test]
    fn test_changed_carries_ids_and_value() {
        let (rack, module, param) = fixtures();
        let param = param.with_value(ParamValue::Float(0.8));
        let event = Notification::Changed {
            rack: &rack,
            module: &module,
            param: &param,
        };
        let msg = decode_single(encode(&event).unwrap());

        assert_eq!(msg.address, ADDR_CHANGED);
        assert_eq!(msg.args[0].as_str(), Some("rack-1"));
        assert_eq!(msg.args[1].as_str(), Some("m1"));
        assert_eq!(msg.args[2].as_str(), Some("mix"));
        assert_eq!(msg.args[3].as_float(), Some(0.8));
    }

    #[test]
    fn test_param_declaration_shape() {
        let (rack, module, param) = fixtures();
        let event = Notification::Param {
            rack: &rack,
            module: &module,
            param: &param,
        };
        let msg = decode_single(encode(&event).unwrap());

        assert_eq!(msg.address, ADDR_PARAM);
        assert_eq!(
            msg.args,
            vec![
                OscArg::Str("rack-1".into()),
                OscArg::Str("m1".into()),
                OscArg::Str("pct".into()),
                OscArg::Str("mix".into()),
                OscArg::Str("Mix".into()),
                OscArg::Float(0.0),
                OscArg::Float(1.0),
                OscArg::Float(0.5),
            ]
        );
    }

    #[test]
    fn test_string_valued_change() {
        let (rack, module, _) = fixtures();
        let param = Parameter::new("algo", "Algo", "list", ParamValue::Str("hall".into()));
        let event = Notification::Changed {
            rack: &rack,
            module: &module,
            param: &param,
        };
        let msg = decode_single(encode(&event).unwrap());
        assert_eq!(msg.args[3].as_str(), Some("hall"));
    }

    #[test]
    fn test_page_lists_parameters() {
        let (rack, module, _) = fixtures();
        let page = Page::new("p1", "Main", vec![EntityId::from("mix"), EntityId::from("size")]);
        let event = Notification::Page {
            rack: &rack,
            module: &module,
            page: &page,
        };
        let msg = decode_single(encode(&event).unwrap());
        assert_eq!(msg.args.len(), 6);
        assert_eq!(msg.args[5].as_str(), Some("size"));
    }

    #[test]
    fn test_learn_toggles_and_bindings() {
        let (rack, module, param) = fixtures();
        let msg = decode_single(encode(&Notification::MidiLearn { enabled: false }).unwrap());
        assert_eq!(msg.address, ADDR_MIDI_LEARN);
        assert_eq!(msg.args, vec![OscArg::Bool(false)]);

        let event = Notification::AssignModulation {
            rack: &rack,
            module: &module,
            param: &param,
            bus: 3,
        };
        let msg = decode_single(encode(&event).unwrap());
        assert_eq!(msg.address, ADDR_ASSIGN_MODULATION);
        assert_eq!(msg.args[3].as_int(), Some(3));
    }

    #[test]
    fn test_ping_observation_encodes_nothing() {
        let event = Notification::Ping {
            host: "127.0.0.1",
            port: 9000,
            keep_alive_ms: 1000,
        };
        let batch = encode(&event).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_ping_announcement() {
        let frame = encode_ping(4000, 5000).unwrap();
        let msg = OscMessage::decode(frame.as_bytes()).unwrap();
        assert_eq!(msg.address, ADDR_PING);
        assert_eq!(msg.args, vec![OscArg::Int(4000), OscArg::Int(5000)]);
    }

    #[test]
    fn test_large_keep_alive_saturates() {
        let frame = encode_ping(4000, 3_000_000_000).unwrap();
        let msg = OscMessage::decode(frame.as_bytes()).unwrap();
        assert_eq!(msg.args, vec![OscArg::Int(4000), OscArg::Int(i32::MAX)]);
    }

    #[test]
    fn test_param_frames_stay_within_limit() {
        let (rack, module, _) = fixtures();
        for n in [0usize, 8, 32] {
            let attributes = (0..n).map(|i| ParamValue::Float(i as f32)).collect();
            let param = Parameter::new("p", "P", "float", ParamValue::Float(1.0))
                .with_attributes(attributes);
            let changed = Notification::Changed {
                rack: &rack,
                module: &module,
                param: &param,
            };
            let batch = encode(&changed).unwrap();
            assert!(batch.frames().iter().all(|f| f.len() <= MAX_OSC_MESSAGE_SIZE));
            let declared = Notification::Param {
                rack: &rack,
                module: &module,
                param: &param,
            };
            let batch = encode(&declared).unwrap();
            assert!(batch.frames().iter().all(|f| f.len() <= MAX_OSC_MESSAGE_SIZE));
        }
    }

    #[test]
    fn test_oversized_declaration_fails_explicitly() {
        let (rack, module, _) = fixtures();
        let attributes = (0..200).map(|i| ParamValue::Str(format!("entry-{i}"))).collect();
        let param = Parameter::new("p", "P", "list", ParamValue::Str("entry-0".into()))
            .with_attributes(attributes);
        let result = encode(&Notification::Param {
            rack: &rack,
            module: &module,
            param: &param,
        });
        assert!(matches!(result, Err(EncodeError::FrameOverflow { .. })));
    }

    #[test]
    fn test_publish_frame_layout() {
        let racks = vec![Rack::new("a", "h", 1), Rack::new("b", "h", 2)];
        let batch = encode_publish(&racks).unwrap();
        assert_eq!(batch.len(), 5);

        let addresses: Vec<String> = batch
            .frames()
            .iter()
            .map(|f| OscMessage::decode(f.as_bytes()).unwrap().address)
            .collect();
        assert_eq!(
            addresses,
            vec![
                ADDR_PUBLISH_START,
                ADDR_RACK,
                ADDR_PUBLISH_RACK_FINISHED,
                ADDR_RACK,
                ADDR_PUBLISH_RACK_FINISHED
            ]
        );
    }

    #[test]
    fn test_publish_bound() {
        let racks: Vec<Rack> = (0..63).map(|i| Rack::new(format!("r{i}"), "h", 1)).collect();
        assert_eq!(encode_publish(&racks).unwrap().len(), MAX_N_OSC_MSGS - 1);

        let racks: Vec<Rack> = (0..64).map(|i| Rack::new(format!("r{i}"), "h", 1)).collect();
        assert_eq!(
            encode_publish(&racks).unwrap_err(),
            EncodeError::BatchOverflow { needed: 129, capacity: MAX_N_OSC_MSGS }
        );
    }
}
