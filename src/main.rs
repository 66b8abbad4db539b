//! Chart Engine - Demo Application Entry Point
//!
//! Shows sample instruments in a multi-pane chart with an egui window.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use tracing::{info, warn};

use chart_engine::chart::{ChartSession, ChartWidget, HoverEvent, JsonLayoutStore, SessionConfig};
use chart_engine::common::{
    generate_sample_series, init_logger, MemoryDatafeed, ScanMatch, ScanSource, SeriesSource, SETTINGS,
};

const DEMO_INSTRUMENTS: [&str; 4] = ["AAPL", "MSFT", "NVDA", "SPY"];
const DEMO_DAYS: usize = 1500;

/// Demo application state
struct ChartApp {
    chart: ChartWidget,
    instruments: Vec<String>,
    scans: MemoryDatafeed,
    query: String,
    results: Vec<ScanMatch>,
    hover_text: Rc<RefCell<String>>,
}

impl ChartApp {
    fn new() -> Self {
        let mut feed = MemoryDatafeed::new();
        let mut scans = MemoryDatafeed::new();

        for (seed, instrument) in DEMO_INSTRUMENTS.iter().enumerate() {
            let series = generate_sample_series(instrument, DEMO_DAYS, seed as u64 + 1);

            // every 40th day above its previous close counts as a scan hit
            for (ix, candle) in series.candles().iter().enumerate().skip(1).step_by(40) {
                if candle.close > series.candles()[ix - 1].close {
                    scans.add_scan_match(ScanMatch {
                        instrument: instrument.to_string(),
                        date: candle.date.clone(),
                        close: candle.close,
                    });
                }
            }
            feed.insert(series);
        }

        let instruments = feed.instruments();
        let store = JsonLayoutStore::from_settings(&SETTINGS);
        info!("layout file: {}", store.path().display());

        let mut session = ChartSession::new(SessionConfig::from_settings(&SETTINGS), Box::new(store));
        session.set_source(Box::new(feed));

        let hover_text = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&hover_text);
        session.on_hover(move |event: &HoverEvent| {
            *sink.borrow_mut() = format_hover(event);
        });

        if let Some(first) = instruments.first() {
            if let Err(e) = session.open_instrument(first) {
                warn!("failed to open {}: {}", first, e);
            }
        }

        let results = scans.load_scan_matches("").unwrap_or_default();

        Self {
            chart: ChartWidget::new(session),
            instruments,
            scans,
            query: String::new(),
            results,
            hover_text,
        }
    }

    fn show_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("instrument_panel")
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.heading("Instruments");
                for instrument in &self.instruments {
                    let selected = self
                        .chart
                        .session()
                        .series()
                        .is_some_and(|s| s.instrument() == instrument.as_str());
                    if ui.selectable_label(selected, instrument.as_str()).clicked() {
                        if let Err(e) = self.chart.session_mut().open_instrument(instrument) {
                            warn!("failed to open {}: {}", instrument, e);
                        }
                    }
                }

                ui.separator();
                ui.heading("Scan");
                if ui.text_edit_singleline(&mut self.query).changed() {
                    self.results = match self.scans.load_scan_matches(&self.query) {
                        Ok(results) => results,
                        Err(e) => {
                            warn!("scan failed: {}", e);
                            Vec::new()
                        }
                    };
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for scan in &self.results {
                        let label = format!("{}  {}  {:.2}", scan.instrument, scan.date, scan.close);
                        if ui.button(label).clicked() {
                            if let Err(e) = self.chart.session_mut().show_scan_match(scan) {
                                warn!("failed to show {} {}: {}", scan.instrument, scan.date, e);
                            }
                        }
                    }
                });
            });
    }
}

fn format_hover(event: &HoverEvent) -> String {
    let c = &event.candle;
    let mut text = format!(
        "{}  O {:.2}  H {:.2}  L {:.2}  C {:.2}  V {:.0}",
        c.date, c.open, c.high, c.low, c.close, c.volume
    );
    let readings = [
        ("SMA20", event.snapshot.sma20),
        ("SMA50", event.snapshot.sma50),
        ("SMA200", event.snapshot.sma200),
        ("EMA9", event.snapshot.ema9),
        ("EMA21", event.snapshot.ema21),
        ("RSI14", event.snapshot.rsi14),
    ];
    for (name, value) in readings {
        if let Some(v) = value {
            text.push_str(&format!("  {} {:.2}", name, v));
        }
    }
    text
}

impl eframe::App for ChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show_side_panel(ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(self.hover_text.borrow().as_str());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart.show(ui);
        });
    }
}

/// Create native window options
fn create_native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Chart Engine")
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger();

    info!("starting Chart Engine {}", chart_engine::VERSION);

    eframe::run_native(
        "Chart Engine",
        create_native_options(),
        Box::new(|_cc| Ok(Box::new(ChartApp::new()))),
    )
    .map_err(|e| format!("Failed to run application: {}", e))?;

    Ok(())
}
