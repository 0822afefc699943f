mod dialog;
mod events;
mod runtime;
mod startup;
mod state;
mod ui;
mod webview;

#[cfg(test)]
mod tests;

pub(crate) use startup::StartupArgs;
pub(crate) use startup::run;

const APP_NAME: &str = "Multi Vibe Chat";
const WINDOW_SIZE: [f32; 2] = [1600.0, 1000.0];
const MIN_WINDOW_SIZE: [f32; 2] = [960.0, 640.0];
const URL_BAR_HEIGHT: u32 = 30;
const POPUP_PANEL_WIDTH: f32 = 520.0;
const POPUP_HEADER_HEIGHT: f32 = 28.0;

const GOOGLE_SIGN_IN_URL: &str = "https://accounts.google.com/";
const GOOGLE_SIGN_IN_TITLE: &str = "Sign in with Google";
const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search";
const GOOGLE_SEARCH_TITLE: &str = "Search on Google";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

const LOG_FILTER_ENV: &str = "MULTIVIBE_LOG";
