use crate::states::AppState;
use bevy::input::keyboard::KeyboardInput;
use bevy::input::ButtonState;
use bevy::prelude::*;
use bevy::window::WindowFocused;

pub struct DriveInputPlugin;

impl Plugin for DriveInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ControlVector>()
            .init_resource::<DriveInputBindings>()
            .add_systems(OnEnter(AppState::Driving), reset_controls)
            .add_systems(OnExit(AppState::Driving), reset_controls);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveControl {
    Forward,
    Backward,
    Left,
    Right,
    Brake,
}

/// Steady-state driver controls. Each flag stays set until a release of one of its keys.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlVector {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

impl ControlVector {
    fn set(&mut self, control: DriveControl, held: bool) -> bool {
        let slot = match control {
            DriveControl::Forward => &mut self.forward,
            DriveControl::Backward => &mut self.backward,
            DriveControl::Left => &mut self.left,
            DriveControl::Right => &mut self.right,
            DriveControl::Brake => &mut self.brake,
        };
        let changed = *slot != held;
        *slot = held;
        changed
    }

    /// Returns `true` when the key toggled a control. Repeats of a held key are no-ops.
    pub fn key_down(&mut self, bindings: &DriveInputBindings, key: KeyCode) -> bool {
        bindings
            .control_for(key)
            .is_some_and(|control| self.set(control, true))
    }

    /// Returns `true` when the key cleared a control that was held.
    pub fn key_up(&mut self, bindings: &DriveInputBindings, key: KeyCode) -> bool {
        bindings
            .control_for(key)
            .is_some_and(|control| self.set(control, false))
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    pub fn is_turning(&self) -> bool {
        self.left || self.right
    }

    /// +1 for left, -1 for right, 0 when both or neither are held.
    pub fn steer_input(&self) -> f32 {
        (self.left as i32 - self.right as i32) as f32
    }
}

#[derive(Resource, Debug, Clone)]
pub struct DriveInputBindings {
    forward: Vec<KeyCode>,
    backward: Vec<KeyCode>,
    left: Vec<KeyCode>,
    right: Vec<KeyCode>,
    brake: Vec<KeyCode>,
}

impl Default for DriveInputBindings {
    fn default() -> Self {
        Self {
            forward: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            backward: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            brake: vec![KeyCode::Space],
        }
    }
}

impl DriveInputBindings {
    pub fn control_for(&self, key: KeyCode) -> Option<DriveControl> {
        [
            (DriveControl::Forward, &self.forward),
            (DriveControl::Backward, &self.backward),
            (DriveControl::Left, &self.left),
            (DriveControl::Right, &self.right),
            (DriveControl::Brake, &self.brake),
        ]
        .into_iter()
        .find_map(|(control, keys)| keys.contains(&key).then_some(control))
    }
}

fn reset_controls(mut controls: ResMut<ControlVector>) {
    controls.release_all();
}

pub(crate) fn sample_drive_input(
    mut keyboard_events: MessageReader<KeyboardInput>,
    mut focus_events: MessageReader<WindowFocused>,
    bindings: Res<DriveInputBindings>,
    mut controls: ResMut<ControlVector>,
) {
    for event in keyboard_events.read() {
        match event.state {
            ButtonState::Pressed => {
                controls.key_down(&bindings, event.key_code);
            }
            ButtonState::Released => {
                controls.key_up(&bindings, event.key_code);
            }
        }
    }

    if focus_events.read().any(|event| !event.focused) {
        controls.release_all();
    }
}
