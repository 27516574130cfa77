//! State change notifications and the callback interface that receives them

use crate::entities::{EntityId, Module, Page, Parameter, Rack};
use crate::source::ChangeSource;

/// A single control-surface state change.
///
/// Borrows the entities involved; listeners copy whatever they need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification<'a> {
    /// Rack created or announced
    Rack { rack: &'a Rack },
    /// Module added to a rack
    Module { rack: &'a Rack, module: &'a Module },
    /// Page added to a module
    Page { rack: &'a Rack, module: &'a Module, page: &'a Page },
    /// Parameter declared on a module
    Param { rack: &'a Rack, module: &'a Module, param: &'a Parameter },
    /// Parameter value changed
    Changed { rack: &'a Rack, module: &'a Module, param: &'a Parameter },
    /// Resource (preset, module type, ...) available on a rack
    Resource { rack: &'a Rack, res_type: &'a str, resource: &'a str },
    DeleteRack { rack: &'a Rack },
    ActiveModule { rack: &'a Rack, module: &'a Module },
    /// Liveness observation from a peer
    Ping { host: &'a str, port: u16, keep_alive_ms: u32 },
    AssignMidiCc {
        rack: &'a Rack,
        module: &'a Module,
        param: &'a Parameter,
        midi_cc: u32,
    },
    UnassignMidiCc {
        rack: &'a Rack,
        module: &'a Module,
        param: &'a Parameter,
        midi_cc: u32,
    },
    AssignModulation {
        rack: &'a Rack,
        module: &'a Module,
        param: &'a Parameter,
        bus: u32,
    },
    UnassignModulation {
        rack: &'a Rack,
        module: &'a Module,
        param: &'a Parameter,
        bus: u32,
    },
    SavePreset { rack: &'a Rack, preset: &'a str },
    LoadPreset { rack: &'a Rack, preset: &'a str },
    SaveSettings { rack: &'a Rack },
    LoadModule {
        rack: &'a Rack,
        module_id: &'a EntityId,
        module_type: &'a str,
    },
    MidiLearn { enabled: bool },
    ModulationLearn { enabled: bool },
    /// A publish of `num_racks` racks is starting
    PublishStart { num_racks: u32 },
    PublishRackFinished { rack: &'a Rack },
}

impl Notification<'_> {
    /// Event name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Rack { .. } => "rack",
            Notification::Module { .. } => "module",
            Notification::Page { .. } => "page",
            Notification::Param { .. } => "param",
            Notification::Changed { .. } => "changed",
            Notification::Resource { .. } => "resource",
            Notification::DeleteRack { .. } => "delete_rack",
            Notification::ActiveModule { .. } => "active_module",
            Notification::Ping { .. } => "ping",
            Notification::AssignMidiCc { .. } => "assign_midi_cc",
            Notification::UnassignMidiCc { .. } => "unassign_midi_cc",
            Notification::AssignModulation { .. } => "assign_modulation",
            Notification::UnassignModulation { .. } => "unassign_modulation",
            Notification::SavePreset { .. } => "save_preset",
            Notification::LoadPreset { .. } => "load_preset",
            Notification::SaveSettings { .. } => "save_settings",
            Notification::LoadModule { .. } => "load_module",
            Notification::MidiLearn { .. } => "midi_learn",
            Notification::ModulationLearn { .. } => "modulation_learn",
            Notification::PublishStart { .. } => "publish_start",
            Notification::PublishRackFinished { .. } => "publish_rack_finished",
        }
    }
}

/// Receiver of control-surface state changes.
///
/// Implementors only provide [`notify`](KontrolCallback::notify) and
/// [`stop`](KontrolCallback::stop); the per-event methods wrap their arguments
/// into a [`Notification`]. Implementations may be called from any thread,
/// including real-time ones, and must not block.
pub trait KontrolCallback: Send + Sync {
    fn notify(&self, src: &ChangeSource, event: &Notification<'_>);

    fn stop(&self);

    fn rack(&self, src: &ChangeSource, rack: &Rack) {
        self.notify(src, &Notification::Rack { rack });
    }

    fn module(&self, src: &ChangeSource, rack: &Rack, module: &Module) {
        self.notify(src, &Notification::Module { rack, module });
    }

    fn page(&self, src: &ChangeSource, rack: &Rack, module: &Module, page: &Page) {
        self.notify(src, &Notification::Page { rack, module, page });
    }

    fn param(&self, src: &ChangeSource, rack: &Rack, module: &Module, param: &Parameter) {
        self.notify(src, &Notification::Param { rack, module, param });
    }

    fn changed(&self, src: &ChangeSource, rack: &Rack, module: &Module, param: &Parameter) {
        self.notify(src, &Notification::Changed { rack, module, param });
    }

    fn resource(&self, src: &ChangeSource, rack: &Rack, res_type: &str, resource: &str) {
        self.notify(src, &Notification::Resource { rack, res_type, resource });
    }

    fn delete_rack(&self, src: &ChangeSource, rack: &Rack) {
        self.notify(src, &Notification::DeleteRack { rack });
    }

    fn active_module(&self, src: &ChangeSource, rack: &Rack, module: &Module) {
        self.notify(src, &Notification::ActiveModule { rack, module });
    }

    fn ping(&self, src: &ChangeSource, host: &str, port: u16, keep_alive_ms: u32) {
        self.notify(src, &Notification::Ping { host, port, keep_alive_ms });
    }

    fn assign_midi_cc(
        &self,
        src: &ChangeSource,
        rack: &Rack,
        module: &Module,
        param: &Parameter,
        midi_cc: u32,
    ) {
        let event = Notification::AssignMidiCc {
            rack,
            module,
            param,
            midi_cc,
        };
        self.notify(src, &event);
    }

    fn unassign_midi_cc(
        &self,
        src: &ChangeSource,
        rack: &Rack,
        module: &Module,
        param: &Parameter,
        midi_cc: u32,
    ) {
        let event = Notification::UnassignMidiCc {
            rack,
            module,
            param,
            midi_cc,
        };
        self.notify(src, &event);
    }

    fn assign_modulation(
        &self,
        src: &ChangeSource,
        rack: &Rack,
        module: &Module,
        param: &Parameter,
        bus: u32,
    ) {
        let event = Notification::AssignModulation {
            rack,
            module,
            param,
            bus,
        };
        self.notify(src, &event);
    }

    fn unassign_modulation(
        &self,
        src: &ChangeSource,
        rack: &Rack,
        module: &Module,
        param: &Parameter,
        bus: u32,
    ) {
        let event = Notification::UnassignModulation {
            rack,
            module,
            param,
            bus,
        };
        self.notify(src, &event);
    }

    fn save_preset(&self, src: &ChangeSource, rack: &Rack, preset: &str) {
        self.notify(src, &Notification::SavePreset { rack, preset });
    }

    fn load_preset(&self, src: &ChangeSource, rack: &Rack, preset: &str) {
        self.notify(src, &Notification::LoadPreset { rack, preset });
    }

    fn save_settings(&self, src: &ChangeSource, rack: &Rack) {
        self.notify(src, &Notification::SaveSettings { rack });
    }

    fn load_module(
        &self,
        src: &ChangeSource,
        rack: &Rack,
        module_id: &EntityId,
        module_type: &str,
    ) {
        let event = Notification::LoadModule {
            rack,
            module_id,
            module_type,
        };
        self.notify(src, &event);
    }

    fn midi_learn(&self, src: &ChangeSource, enabled: bool) {
        self.notify(src, &Notification::MidiLearn { enabled });
    }

    fn modulation_learn(&self, src: &ChangeSource, enabled: bool) {
        self.notify(src, &Notification::ModulationLearn { enabled });
    }

    fn publish_start(&self, src: &ChangeSource, num_racks: u32) {
        self.notify(src, &Notification::PublishStart { num_racks });
    }

    fn publish_rack_finished(&self, src: &ChangeSource, rack: &Rack) {
        self.notify(src, &Notification::PublishRackFinished { rack });
    }
}
