use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, Screen, SettingsField};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Shared line-editing for the prompt and the settings fields.
/// Returns true when the key was consumed.
fn edit_text(input: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
            true
        }
        KeyCode::Delete => {
            if *cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
            true
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
            true
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(input.chars().count());
            true
        }
        KeyCode::Home => {
            *cursor = 0;
            true
        }
        KeyCode::End => {
            *cursor = input.chars().count();
            true
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
            true
        }
        _ => false,
    }
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_tasks().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Compose, InputMode::Normal) => handle_compose_normal(app, key),
        (Screen::Compose, InputMode::Editing) => handle_compose_editing(app, key),
        (Screen::Settings, InputMode::Normal) => handle_settings_normal(app, key),
        (Screen::Settings, InputMode::Editing) => handle_settings_editing(app, key),
    }
}

fn handle_compose_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Edit the prompt
        KeyCode::Char('i') | KeyCode::Char('e') => app.input_mode = InputMode::Editing,

        KeyCode::Enter => app.submit_prompt(),

        // Theme cycling re-renders whatever is on screen
        KeyCode::Char('t') => app.cycle_theme(),

        // Save the rendered diagram as diagram.svg
        KeyCode::Char('d') => app.export(),

        // Disclosure of the failing (or current) raw source
        KeyCode::Char('v') => app.show_source = !app.show_source,

        KeyCode::Char('s') => app.open_settings(),

        _ => {}
    }
}

fn handle_compose_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.submit_prompt();
            app.input_mode = InputMode::Normal;
        }
        _ => {
            edit_text(&mut app.prompt_input, &mut app.prompt_cursor, key);
        }
    }
}

fn handle_settings_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => {
            app.screen = Screen::Compose;
        }
        KeyCode::Char('i') | KeyCode::Char('e') => app.input_mode = InputMode::Editing,
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => toggle_settings_field(app),
        // Mask toggle, as the web form's eye button
        KeyCode::Char('k') => app.show_api_key = !app.show_api_key,
        KeyCode::Enter => app.save_settings(),
        _ => {}
    }
}

fn handle_settings_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab => toggle_settings_field(app),
        KeyCode::Enter => {
            app.save_settings();
        }
        _ => {
            let (input, cursor) = match app.settings_field {
                SettingsField::ModelName => (&mut app.model_input, &mut app.model_cursor),
                SettingsField::ApiKey => (&mut app.key_input, &mut app.key_cursor),
            };
            edit_text(input, cursor, key);
        }
    }
}

fn toggle_settings_field(app: &mut App) {
    app.settings_field = match app.settings_field {
        SettingsField::ModelName => SettingsField::ApiKey,
        SettingsField::ApiKey => SettingsField::ModelName,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn edit_text_inserts_at_cursor() {
        let mut input = "ac".to_string();
        let mut cursor = 1;
        edit_text(&mut input, &mut cursor, press(KeyCode::Char('b')));
        assert_eq!(input, "abc");
        assert_eq!(cursor, 2);
    }

    #[test]
    fn edit_text_handles_multibyte_chars() {
        let mut input = "héllo".to_string();
        let mut cursor = 2;
        edit_text(&mut input, &mut cursor, press(KeyCode::Backspace));
        assert_eq!(input, "hllo");
        assert_eq!(cursor, 1);
    }

    #[test]
    fn edit_text_cursor_stays_in_bounds() {
        let mut input = "ab".to_string();
        let mut cursor = 2;
        edit_text(&mut input, &mut cursor, press(KeyCode::Right));
        assert_eq!(cursor, 2);
        edit_text(&mut input, &mut cursor, press(KeyCode::End));
        assert_eq!(cursor, 2);
        edit_text(&mut input, &mut cursor, press(KeyCode::Home));
        assert_eq!(cursor, 0);
        edit_text(&mut input, &mut cursor, press(KeyCode::Left));
        assert_eq!(cursor, 0);
    }
}
