use crate::camera::NavigationInput;
use crate::coords::Vec2;
use crate::input::{InputFrame, InputState, Key};

const FORWARD: [Key; 2] = [Key::ArrowUp, Key::W];
const BACKWARD: [Key; 2] = [Key::ArrowDown, Key::S];
const LEFT: [Key; 2] = [Key::ArrowLeft, Key::A];
const RIGHT: [Key; 2] = [Key::ArrowRight, Key::D];

/// Key that ends the viewer.
pub const QUIT_KEY: Key = Key::Escape;

/// Builds this tick's navigation input from held keys and the frame's mouse motion.
///
/// `strafe_right` is the coefficient along `direction x up`, which points to
/// screen left, so the left keys give `+1`. Opposing keys cancel. Mouse `y`
/// grows downward; it is negated so moving the mouse up looks up.
pub fn navigation_input(state: &InputState, frame: &InputFrame) -> NavigationInput {
    NavigationInput {
        strafe_forward: axis(state.any_down(&FORWARD), state.any_down(&BACKWARD)),
        strafe_right: axis(state.any_down(&LEFT), state.any_down(&RIGHT)),
        look: Vec2::new(frame.mouse_motion.x, -frame.mouse_motion.y),
    }
}

pub fn quit_requested(frame: &InputFrame) -> bool {
    frame.key_pressed(QUIT_KEY)
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, KeyState};

    fn press(state: &mut InputState, frame: &mut InputFrame, key: Key) {
        state.apply_event(frame, InputEvent::Key { key, state: KeyState::Pressed, repeat: false });
    }

    #[test]
    fn no_keys_is_idle() {
        let input = navigation_input(&InputState::default(), &InputFrame::default());
        assert!(input.is_idle());
    }

    #[test]
    fn arrows_and_wasd_drive_the_same_axes() {
        for (key, fwd, side) in [
            (Key::ArrowUp, 1.0, 0.0),
            (Key::W, 1.0, 0.0),
            (Key::ArrowDown, -1.0, 0.0),
            (Key::S, -1.0, 0.0),
            (Key::ArrowLeft, 0.0, 1.0),
            (Key::A, 0.0, 1.0),
            (Key::ArrowRight, 0.0, -1.0),
            (Key::D, 0.0, -1.0),
        ] {
            let (mut state, mut frame) = (InputState::default(), InputFrame::default());
            press(&mut state, &mut frame, key);
            let input = navigation_input(&state, &frame);
            assert_eq!((input.strafe_forward, input.strafe_right), (fwd, side), "{key}");
        }
    }

    #[test]
    fn opposing_keys_cancel() {
        let (mut state, mut frame) = (InputState::default(), InputFrame::default());
        press(&mut state, &mut frame, Key::W);
        press(&mut state, &mut frame, Key::ArrowDown);
        assert_eq!(navigation_input(&state, &frame).strafe_forward, 0.0);
    }

    #[test]
    fn mouse_up_looks_up() {
        let (mut state, mut frame) = (InputState::default(), InputFrame::default());
        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 4.0, dy: -3.0 });
        assert_eq!(navigation_input(&state, &frame).look, Vec2::new(4.0, 3.0));
    }

    #[test]
    fn escape_press_requests_quit() {
        let (mut state, mut frame) = (InputState::default(), InputFrame::default());
        assert!(!quit_requested(&frame));
        press(&mut state, &mut frame, Key::Escape);
        assert!(quit_requested(&frame));
    }
}
