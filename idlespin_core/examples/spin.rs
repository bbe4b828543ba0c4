use idlespin_core::{GameRules, MachineCatalog, NullSink, PlayerSession, SeededRandom, SessionContext};

fn main() {
    // Example end-to-end spin on the built-in catalog
    let rules = GameRules::default();
    let catalog = MachineCatalog::builtin();
    let machine = catalog.get("classic").expect("built-in machine");
    let mut rng = SeededRandom::new("example-seed", "example-player", 1);
    let mut ctx = SessionContext {
        rng: &mut rng,
        sink: &NullSink,
        now: chrono::Utc::now(),
    };
    let mut session = PlayerSession::fresh("example-player", &rules);
    let report = session
        .spin(machine, machine.bet_options[0], &rules, &mut ctx)
        .expect("fresh player can afford the lowest bet");
    println!(
        "symbols={:?} win={} tier={:?} coins={}",
        report.outcome.symbols, report.outcome.win, report.outcome.tier, report.coins
    );
}
