use std::error::Error;
use eframe::egui;
use tracing::error;
use crate::error::{LauncherError, Result};
use crate::launcher::{format_command_line, LaunchReport};
use crate::settings::SettingsForm;

const RTX_REQUIRED: &str = "Isaac Sim requires an NVIDIA RTX GPU.";

pub trait AppInterface {
    fn devices(&self) -> &[String];
    fn templates(&self) -> &[String];
    fn selected_device(&self) -> &str;
    fn select_device(&mut self, device: &str);
    fn selected_template(&self) -> &str;
    fn select_template(&mut self, template: &str);
    fn can_launch(&self) -> bool;
    fn launch(&mut self) -> Result<LaunchReport>;
    fn settings_form(&self) -> SettingsForm;
    fn apply_settings(&mut self, form: &SettingsForm) -> Result<()>;
}

fn error_title(e: &LauncherError) -> &'static str {
    if e.is_not_found() { "Not Found" } else { "Error" }
}

struct Message {
    title: &'static str,
    body: String,
}

pub struct EframeGui;
impl EframeGui {
    pub fn run(app: Box<dyn AppInterface>) -> std::result::Result<(), Box<dyn Error>> {
        let native_options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([440.0, 180.0])
                .with_resizable(false),
            ..Default::default()
        };
        eframe::run_native("Isaac Sim Launcher", native_options, Box::new(|_cc| {
            Ok(Box::new(EframeWrapper {
                app,
                message: None,
                settings: None,
            }))
        }))?;
        Ok(())
    }
}

struct EframeWrapper {
    app: Box<dyn AppInterface>,
    message: Option<Message>,
    settings: Option<SettingsForm>,
}

impl EframeWrapper {
    fn render_selection(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("selection")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("GPU:");
                let mut device = self.app.selected_device().to_string();
                egui::ComboBox::from_id_salt("gpu")
                    .width(300.0)
                    .selected_text(device.as_str())
                    .show_ui(ui, |ui| {
                        for name in self.app.devices() {
                            ui.selectable_value(&mut device, name.clone(), name.as_str());
                        }
                    });
                if device != self.app.selected_device() {
                    self.app.select_device(&device);
                }
                ui.end_row();

                ui.label("Template:");
                let mut template = self.app.selected_template().to_string();
                egui::ComboBox::from_id_salt("template")
                    .width(300.0)
                    .selected_text(template.as_str())
                    .show_ui(ui, |ui| {
                        for name in self.app.templates() {
                            ui.selectable_value(&mut template, name.clone(), name.as_str());
                        }
                    });
                if template != self.app.selected_template() {
                    self.app.select_template(&template);
                }
                ui.end_row();
            });
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let launch = ui
                .add_enabled(self.app.can_launch(), egui::Button::new("Launch"))
                .on_disabled_hover_text(RTX_REQUIRED);
            if launch.clicked() {
                self.launch();
            }
            if ui.button("Settings").clicked() && self.settings.is_none() {
                self.settings = Some(self.app.settings_form());
            }
        });
    }

    fn launch(&mut self) {
        // Button state can lag a frame behind the selection.
        if !self.app.can_launch() {
            self.message = Some(Message {
                title: "GPU Error",
                body: format!("No NVIDIA RTX GPU detected.\n{RTX_REQUIRED}"),
            });
            return;
        }
        self.message = Some(match self.app.launch() {
            Ok(report) => Message {
                title: "Launch",
                body: format!(
                    "Isaac Sim launched on GPU: {}\n{} (pid {})\nin {}",
                    self.app.selected_device(),
                    format_command_line(&report.command_line),
                    report.pid,
                    report.working_dir.display()
                ),
            },
            Err(e) => {
                error!(error = %e, "launch failed");
                Message {
                    title: error_title(&e),
                    body: format!("Launch failed:\n{e}"),
                }
            }
        });
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.settings.take() else {
            return;
        };
        let (mut save, mut cancel) = (false, false);
        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Isaac Sim path:");
                    ui.text_edit_singleline(&mut form.install_path);
                });
                ui.checkbox(&mut form.logging_enabled, "Write launch log");
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });
        if save {
            self.message = Some(match self.app.apply_settings(&form) {
                Ok(()) => Message {
                    title: "Settings",
                    body: "Settings saved successfully.".into(),
                },
                Err(e) => Message {
                    title: "Error",
                    body: format!("Could not save settings:\n{e}"),
                },
            });
        } else if !cancel {
            self.settings = Some(form);
        }
    }

    fn render_message(&mut self, ctx: &egui::Context) {
        let Some(message) = &self.message else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new(message.title)
            .id(egui::Id::new("message"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message.body);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.message = None;
        }
    }
}

impl eframe::App for EframeWrapper {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(self.message.is_none(), |ui| {
                self.render_selection(ui);
                ui.add_space(8.0);
                self.render_buttons(ui);
            });
        });
        self.render_settings(ctx);
        self.render_message(ctx);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.message.is_some() {
                self.message = None;
            } else if self.settings.is_some() {
                self.settings = None;
            } else {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }
}
