//! System tray icon with state-based updates.
//!
//! Manages a system tray icon with four states (Idle, Recording, Previewing,
//! Uploading) and a context menu whose items follow the session phase.

use crate::{AppError, AppResult, TrayIconState};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{info, instrument};
use tray_icon::menu::{Menu, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// Side length of the generated tray icon, in pixels.
const ICON_SIZE: u32 = 32;

/// Menu item ids, handed to the async side to interpret menu events.
#[derive(Debug, Clone)]
pub struct TrayMenuIds {
    /// "Start Recording".
    pub start: MenuId,
    /// "Stop Recording".
    pub stop: MenuId,
    /// "Record Again".
    pub record_again: MenuId,
    /// "Submit Video".
    pub submit: MenuId,
    /// "Exit".
    pub exit: MenuId,
}

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    start_item: MenuItem,
    stop_item: MenuItem,
    record_again_item: MenuItem,
    submit_item: MenuItem,
    menu_ids: TrayMenuIds,
}

impl TrayManager {
    /// Create a new tray manager in the Idle state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();

        let start_item = MenuItem::new("Start Recording", true, None);
        let stop_item = MenuItem::new("Stop Recording", false, None);
        let record_again_item = MenuItem::new("Record Again", false, None);
        let submit_item = MenuItem::new("Submit Video", false, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let menu_ids = TrayMenuIds {
            start: start_item.id().clone(),
            stop: stop_item.id().clone(),
            record_again: record_again_item.id().clone(),
            submit: submit_item.id().clone(),
            exit: exit_item.id().clone(),
        };

        menu.append_items(&[
            &start_item,
            &stop_item,
            &record_again_item,
            &submit_item,
            &PredefinedMenuItem::separator(),
            &exit_item,
        ])
        .map_err(|e| AppError::TrayError {
            reason: format!("Failed to build tray menu: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let icon = Self::render_icon(TrayIconState::Idle)?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(TrayIconState::Idle.tooltip())
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            start_item,
            stop_item,
            record_again_item,
            submit_item,
            menu_ids,
        })
    }

    /// Update the tray icon, tooltip, and enabled menu items.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn update_state(&mut self, state: TrayIconState) -> AppResult<()> {
        self.tray_icon
            .set_icon(Some(Self::render_icon(state)?))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.tray_icon
            .set_tooltip(Some(state.tooltip()))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update tooltip: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let actions = state.menu_actions();
        self.start_item.set_enabled(actions.start);
        self.stop_item.set_enabled(actions.stop);
        self.record_again_item.set_enabled(actions.record_again);
        self.submit_item.set_enabled(actions.submit);

        Ok(())
    }

    /// Get the menu item ids.
    pub fn menu_ids(&self) -> &TrayMenuIds {
        &self.menu_ids
    }

    /// Draws a filled disc in the state's colour.
    #[track_caller]
    fn render_icon(state: TrayIconState) -> AppResult<Icon> {
        let rgba = icon_pixels(state);

        Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE).map_err(|e| AppError::TrayError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Colour of the tray disc for each state.
pub(crate) fn icon_color(state: TrayIconState) -> [u8; 3] {
    match state {
        TrayIconState::Idle => [0x9e, 0x9e, 0x9e],
        TrayIconState::Recording => [0xe5, 0x39, 0x35],
        TrayIconState::Previewing => [0x43, 0xa0, 0x47],
        TrayIconState::Uploading => [0x1e, 0x88, 0xe5],
    }
}

/// RGBA pixels of a `ICON_SIZE` square with a disc on a transparent field.
pub(crate) fn icon_pixels(state: TrayIconState) -> Vec<u8> {
    let [r, g, b] = icon_color(state);
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 1.0;

    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let alpha = if dx * dx + dy * dy <= radius * radius {
                0xff
            } else {
                0x00
            };
            rgba.extend_from_slice(&[r, g, b, alpha]);
        }
    }
    rgba
}
