use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Days, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gpicks::config::AppConfig;
use gpicks::correlation::{
    CorrelationKind, ScriptContext, best_partners, game_script_priors, lineup_correlation_matrix,
};
use gpicks::kelly::{
    DEFAULT_MAX_LEGS, ParlayCandidate, RiskTolerance, kelly_stake, optimize_parlay_exhaustive,
    optimize_parlay_size, recommend_parlay_structure, slip_ev,
};
use gpicks::ledger::{Action, BetTags, GroupBy, Ledger, LedgerQuery};
use gpicks::picks_csv::{load_picks, write_scored_picks, write_slips};
use gpicks::sigma::{DEFAULT_LOOKBACK, DEFAULT_TREND_WINDOW, player_history, trend};
use gpicks::slip::{DEFAULT_SLIP_SIZE, SettleLeg, SlipEvaluator, SlipMetrics, settle, top_picks};
use gpicks::{Direction, EvScorer, GameScript, RoleTag, ScoredPick, ScoringParams};

#[derive(Parser)]
#[command(name = "gpicks")]
#[command(version, about = "Prop slip scoring and bankroll tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Scoring params JSON (overrides GPICKS_PARAMS)
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Ledger file (overrides GPICKS_LEDGER)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one slip
    Eval {
        #[arg(long)]
        csv: PathBuf,

        /// Pick ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        slip: Vec<String>,

        /// Picks the slip must hold
        #[arg(long, default_value_t = DEFAULT_SLIP_SIZE)]
        size: usize,

        #[arg(long, default_value = "neutral")]
        script: String,

        #[arg(long, value_enum, default_value_t = ModelArg::Priors)]
        model: ModelArg,

        /// Game total for the position model
        #[arg(long)]
        total: Option<f64>,

        /// Decimal odds of the whole slip, for its EV
        #[arg(long)]
        odds: Option<f64>,

        /// Stake used with --odds
        #[arg(long, default_value = "1")]
        stake: f64,

        /// Write the slip's scored picks to this CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Rank every slip from the best picks
    Suggest {
        #[arg(long)]
        csv: PathBuf,

        /// Number of slips to print
        #[arg(long, default_value = "10")]
        top: usize,

        /// Picks per slip
        #[arg(long, default_value_t = DEFAULT_SLIP_SIZE)]
        size: usize,

        /// Pool size before ranking (default GPICKS_TOP_PICKS)
        #[arg(long)]
        pool: Option<usize>,

        #[arg(long, default_value = "neutral")]
        script: String,

        #[arg(long, value_enum, default_value_t = ModelArg::Priors)]
        model: ModelArg,

        #[arg(long)]
        total: Option<f64>,

        /// Also list correlated partners for each anchor
        #[arg(long)]
        partners: bool,

        /// Write ranked slips to this CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Pairwise correlation matrix for a pick file
    Matrix {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long, default_value = "neutral")]
        script: String,

        #[arg(long, value_enum, default_value_t = ModelArg::Position)]
        model: ModelArg,

        #[arg(long)]
        total: Option<f64>,
    },

    /// Game script probabilities from pace, spread and total
    Script {
        #[arg(long)]
        team_pace: f64,

        #[arg(long)]
        opp_pace: f64,

        #[arg(long, allow_hyphen_values = true)]
        spread: f64,

        #[arg(long)]
        total: f64,
    },

    /// Hit rate, sigma and trend from a player's recent games
    History {
        /// Prop line to measure against
        #[arg(long)]
        line: f64,

        /// Recent results, oldest first, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        games: Vec<f64>,

        #[arg(long, default_value_t = DEFAULT_LOOKBACK)]
        lookback: usize,

        #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,
    },

    /// Bankroll ledger
    Bankroll {
        #[command(subcommand)]
        command: BankrollCommand,
    },

    /// Parlay size optimisation
    Parlay {
        #[arg(long, value_delimiter = ',', required = true)]
        probs: Vec<f64>,

        #[arg(long, value_delimiter = ',', required = true)]
        odds: Vec<f64>,

        #[arg(long, default_value_t = DEFAULT_MAX_LEGS)]
        max_legs: usize,

        /// Search every subset instead of the greedy prefix
        #[arg(long)]
        exhaustive: bool,

        /// Recommend a structure and stake for this risk level
        #[arg(long, value_enum)]
        risk: Option<RiskArg>,

        /// Stake ceiling for the recommendation
        #[arg(long, default_value = "100")]
        budget: f64,
    },
}

#[derive(Subcommand)]
enum BankrollCommand {
    Init {
        amount: f64,
    },
    Bet {
        slip: String,
        stake: f64,
        #[arg(long)]
        script: Option<String>,
        #[arg(long)]
        stack: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Result {
        slip: String,
        /// win, loss or push
        result: String,
        #[arg(default_value = "0")]
        payout: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Grade an open bet from each leg's actual result
    Settle {
        slip: String,
        /// Decimal odds of the whole slip
        #[arg(long)]
        odds: f64,
        /// LINE:ACTUAL[:over|under]; use `-` for a result not yet in
        #[arg(long = "leg", value_parser = parse_leg, required = true)]
        legs: Vec<SettleLeg>,
        /// Defaults to the open bet's stake
        #[arg(long)]
        stake: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    Show,
    Query {
        #[arg(long)]
        script: Option<String>,
        #[arg(long)]
        stack: Option<String>,
        /// YYYY-MM-DD, inclusive
        #[arg(long, value_parser = parse_day_start)]
        from: Option<DateTime<Local>>,
        /// YYYY-MM-DD, inclusive
        #[arg(long, value_parser = parse_day_after)]
        to: Option<DateTime<Local>>,
    },
    Kelly {
        prob: f64,
        odds: f64,
        /// Defaults to the ledger balance
        #[arg(long)]
        bankroll: Option<f64>,
        #[arg(long)]
        fraction: Option<f64>,
        #[arg(long)]
        max_pct: Option<f64>,
    },
    Roi {
        #[arg(long, value_enum, default_value_t = GroupArg::Script)]
        by: GroupArg,
    },
    Export {
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Priors,
    Position,
}

impl From<ModelArg> for CorrelationKind {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Priors => CorrelationKind::Priors,
            ModelArg::Position => CorrelationKind::Position,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupArg {
    Script,
    Stack,
}

#[derive(Clone, Copy, ValueEnum)]
enum RiskArg {
    Low,
    Medium,
    High,
}

impl From<RiskArg> for RiskTolerance {
    fn from(r: RiskArg) -> Self {
        match r {
            RiskArg::Low => RiskTolerance::Low,
            RiskArg::Medium => RiskTolerance::Medium,
            RiskArg::High => RiskTolerance::High,
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(path) = cli.params {
        config.params_path = Some(path);
    }
    if let Some(path) = cli.ledger {
        config.ledger_path = path;
    }

    match cli.command {
        Commands::Eval {
            csv,
            slip,
            size,
            script,
            model,
            total,
            odds,
            stake,
            export,
        } => {
            let ctx = context(script, total);
            let pricing = odds.map(|o| (o, stake));
            run_eval(&config, &csv, &slip, size, &ctx, model, pricing, export.as_deref())
        }
        Commands::Suggest {
            csv,
            top,
            size,
            pool,
            script,
            model,
            total,
            partners,
            export,
        } => {
            let pool = pool.unwrap_or(config.top_picks);
            let ctx = context(script, total);
            run_suggest(&config, &csv, top, size, pool, &ctx, model, partners, export.as_deref())
        }
        Commands::Matrix {
            csv,
            script,
            model,
            total,
        } => run_matrix(&config, &csv, &context(script, total), model),
        Commands::Script {
            team_pace,
            opp_pace,
            spread,
            total,
        } => {
            let priors = game_script_priors(team_pace, opp_pace, spread, total);
            for script in GameScript::ALL {
                println!("{:<10} {:>6.1}%", script.as_str(), priors.get(script) * 100.0);
            }
            println!("most likely: {}", priors.most_likely().as_str());
            Ok(())
        }
        Commands::History {
            line,
            games,
            lookback,
            window,
        } => {
            let h = player_history(&games, line, lookback);
            let t = trend(&games, window);
            println!("games           {}", h.games);
            println!("mean            {:.2} (sd {:.2})", h.mean, h.std_dev);
            println!("z vs line       {:+.2}", h.z_score);
            println!("hit rate        {:.1}%", h.hit_rate * 100.0);
            println!("consistency     {:.3}", h.consistency);
            println!("trend           {:+.2}/game (r2 {:.2})", t.slope, t.strength);
            println!("momentum        {:+.2}", t.momentum);
            Ok(())
        }
        Commands::Bankroll { command } => run_bankroll(&config, command),
        Commands::Parlay {
            probs,
            odds,
            max_legs,
            exhaustive,
            risk,
            budget,
        } => run_parlay(&config, &probs, &odds, max_legs, exhaustive, risk, budget),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn context(script: String, total: Option<f64>) -> ScriptContext {
    let ctx = ScriptContext::new(script);
    match total {
        Some(t) => ctx.with_total_line(t),
        None => ctx,
    }
}

fn load_params(config: &AppConfig) -> Arc<ScoringParams> {
    Arc::new(ScoringParams::load_or_reference(config.params_path.as_deref()))
}

fn score_file(params: &Arc<ScoringParams>, csv: &Path) -> Result<Vec<ScoredPick>> {
    let picks = load_picks(csv)?;
    let scored = EvScorer::new(params.clone())
        .score_all(picks)
        .with_context(|| format!("score picks from {}", csv.display()))?;
    Ok(scored)
}

#[allow(clippy::too_many_arguments)]
fn run_eval(
    config: &AppConfig,
    csv: &Path,
    ids: &[String],
    size: usize,
    ctx: &ScriptContext,
    model: ModelArg,
    pricing: Option<(f64, f64)>,
    export: Option<&Path>,
) -> Result<()> {
    let params = load_params(config);
    let scored = score_file(&params, csv)?;
    let evaluator = SlipEvaluator::new(params.clone(), CorrelationKind::from(model).build(params))
        .with_max_pool(config.max_pool);
    let ids = ids.iter().map(|s| s.trim()).collect::<Vec<_>>();
    let metrics = evaluator.evaluate_ids(&scored, &ids, ctx, size)?;
    let picks = slip_picks(&scored, &metrics);

    for p in &picks {
        print_pick(p);
    }
    println!();
    print_slip_detail(&metrics);

    if let Some((odds, stake)) = pricing {
        let probs = picks.iter().map(|p| p.score.win_probability).collect::<Vec<_>>();
        let e = slip_ev(&probs, odds, stake);
        println!("slip win prob   {:.2}%", e.win_probability * 100.0);
        println!("implied prob    {:.2}%", e.implied_probability * 100.0);
        println!("expected return {:.2} on {:.2}", e.expected_return, stake);
        println!("slip ev         {:+.2}%", e.ev_percent);
    }

    if let Some(path) = export {
        write_scored_picks(path, &picks)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

/// The scored picks of a slip, in slip order.
fn slip_picks(scored: &[ScoredPick], metrics: &SlipMetrics) -> Vec<ScoredPick> {
    metrics
        .pick_ids
        .iter()
        .filter_map(|id| scored.iter().find(|p| p.id() == id))
        .cloned()
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn run_suggest(
    config: &AppConfig,
    csv: &Path,
    top: usize,
    size: usize,
    pool: usize,
    ctx: &ScriptContext,
    model: ModelArg,
    partners: bool,
    export: Option<&Path>,
) -> Result<()> {
    let params = load_params(config);
    let scored = score_file(&params, csv)?;
    let shortlist = top_picks(&scored, pool);
    let evaluator = SlipEvaluator::new(params.clone(), CorrelationKind::from(model).build(params))
        .with_max_pool(config.max_pool);
    let ranked = evaluator.rank_combinations(&shortlist, size, ctx, top)?;

    println!(
        "{} picks, ranked {} of the top {} into {}-pick slips ({} model, {} script)",
        scored.len(),
        ranked.len(),
        shortlist.len(),
        size,
        evaluator.model().name(),
        ctx.name
    );
    for (i, m) in ranked.iter().enumerate() {
        println!(
            "#{:<3} {}  score {:>5.1}  p {:>5.1}%  ev {:>5.1}%  corr {:>6.3}  [{}]",
            i + 1,
            m.grade,
            m.overall_score,
            m.avg_win_prob * 100.0,
            m.avg_ev,
            m.correlation_sum,
            m.players_label()
        );
    }

    if partners {
        let picks = shortlist.iter().map(|p| p.pick.clone()).collect::<Vec<_>>();
        for anchor in shortlist.iter().filter(|p| p.score.role_tag == RoleTag::Anchor) {
            let found = best_partners(evaluator.model(), &anchor.pick, &picks, ctx, 3);
            if found.is_empty() {
                continue;
            }
            println!("\n{} ({}) partners:", anchor.pick.player, anchor.pick.stat_type);
            for p in found {
                println!("  {:<24} corr {:>6.3}  boost {:>5.3}", p.player, p.correlation, p.ev_boost);
            }
        }
    }

    if let Some(path) = export {
        write_slips(path, &ranked)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn run_matrix(config: &AppConfig, csv: &Path, ctx: &ScriptContext, model: ModelArg) -> Result<()> {
    let params = load_params(config);
    let picks = load_picks(csv)?;
    let model = CorrelationKind::from(model).build(params);
    let matrix = lineup_correlation_matrix(model.as_ref(), &picks, ctx);
    print!("{:>8}", "");
    for p in &picks {
        print!("{:>8}", p.id);
    }
    println!();
    for (p, row) in picks.iter().zip(&matrix) {
        print!("{:>8}", p.id);
        for v in row {
            print!("{:>8.3}", v);
        }
        println!();
    }
    Ok(())
}

fn run_bankroll(config: &AppConfig, command: BankrollCommand) -> Result<()> {
    let mut ledger = Ledger::open(&config.ledger_path);
    match command {
        BankrollCommand::Init { amount } => {
            ledger.initialize(amount)?;
            println!("bankroll initialized at {:.2}", amount);
        }
        BankrollCommand::Bet {
            slip,
            stake,
            script,
            stack,
            notes,
        } => {
            let tags = BetTags {
                game_script: script,
                stack_type: stack,
                notes,
            };
            let e = ledger.log_bet(&slip, stake, tags)?;
            println!("bet {} on {}; balance {:.2}", stake, e.slip_id, e.balance_after);
        }
        BankrollCommand::Result {
            slip,
            result,
            payout,
            notes,
        } => {
            let action = Action::parse_result(&result)?;
            let e = ledger.log_result(&slip, action, payout, notes)?;
            println!("{} {} paid {:.2}; balance {:.2}", e.slip_id, e.action, payout, e.balance_after);
        }
        BankrollCommand::Settle {
            slip,
            odds,
            legs,
            stake,
            notes,
        } => {
            let stake = match stake.or_else(|| ledger.open_stake(&slip)) {
                Some(s) => s,
                None => bail!("slip {slip} has no open bet; pass --stake to price it anyway"),
            };
            let settled = settle(&legs, stake, odds)?;
            let legs = settled.legs.iter().map(|o| o.as_str()).collect::<Vec<_>>().join(" ");
            println!("legs            {}", legs);
            match settled.action() {
                Some(action) => {
                    let e = ledger.log_result(&slip, action, settled.payout, notes)?;
                    println!(
                        "{} {} paid {:.2}; balance {:.2}",
                        e.slip_id, e.action, settled.payout, e.balance_after
                    );
                }
                None => println!("{slip} still pending; nothing logged"),
            }
        }
        BankrollCommand::Show => {
            let s = ledger.summary();
            println!("ledger          {}", ledger.path().display());
            println!("balance         {:.2}", s.current_balance);
            println!("starting        {:.2}", s.starting_balance);
            println!("profit          {:+.2}", s.profit);
            println!("staked          {:.2}", s.total_staked);
            println!("returned        {:.2}", s.total_returned);
            println!(
                "bets            {} ({}W {}L {}P, {} open)",
                s.total_bets, s.wins, s.losses, s.pushes, s.open_bets
            );
            println!("win rate        {:.1}%", s.win_rate);
            println!("roi             {:+.1}%", s.roi);
        }
        BankrollCommand::Query {
            script,
            stack,
            from,
            to,
        } => {
            let q = LedgerQuery {
                game_script: script,
                stack_type: stack,
                date_from: from,
                date_to: to,
            };
            for e in ledger.query(&q) {
                println!(
                    "{}  {:<10} {:<10} {:>10.2} -> {:>10.2}  {} {}",
                    e.timestamp.format("%Y-%m-%d %H:%M"),
                    e.slip_id,
                    e.action,
                    e.amount,
                    e.balance_after,
                    e.game_script.as_deref().unwrap_or("-"),
                    e.stack_type.as_deref().unwrap_or("-"),
                );
            }
        }
        BankrollCommand::Kelly {
            prob,
            odds,
            bankroll,
            fraction,
            max_pct,
        } => {
            let bankroll = bankroll.unwrap_or(ledger.current_balance());
            let k = kelly_stake(
                prob,
                odds,
                bankroll,
                fraction.unwrap_or(config.kelly_fraction),
                max_pct.unwrap_or(config.max_stake_pct),
            );
            println!("bankroll        {:.2}", bankroll);
            println!("edge            {:+.2}%", k.edge * 100.0);
            println!("full kelly      {:.2}%", k.full_kelly_pct);
            println!("applied         {:.2}%", k.kelly_pct);
            println!("stake           {:.2}", k.stake);
        }
        BankrollCommand::Roi { by } => {
            let group = match by {
                GroupArg::Script => GroupBy::Script,
                GroupArg::Stack => GroupBy::Stack,
            };
            for g in ledger.roi_by(group) {
                println!(
                    "{:<16} bets {:>3} graded {:>3} staked {:>10.2} returned {:>10.2} roi {:>+7.1}%",
                    g.key, g.bets, g.graded, g.staked, g.returned, g.roi
                );
            }
        }
        BankrollCommand::Export { out } => {
            ledger.export_csv(&out)?;
            println!("wrote {} entries to {}", ledger.entries().len(), out.display());
        }
    }
    Ok(())
}

fn run_parlay(
    config: &AppConfig,
    probs: &[f64],
    odds: &[f64],
    max_legs: usize,
    exhaustive: bool,
    risk: Option<RiskArg>,
    budget: f64,
) -> Result<()> {
    if let Some(risk) = risk {
        if probs.len() != odds.len() {
            bail!("--probs has {} values but --odds has {}", probs.len(), odds.len());
        }
        let candidates = probs
            .iter()
            .zip(odds)
            .enumerate()
            .map(|(i, (p, o))| ParlayCandidate {
                id: i.to_string(),
                win_probability: *p,
                odds: *o,
            })
            .collect::<Vec<_>>();
        let bankroll = Ledger::open(&config.ledger_path).current_balance();
        let rec = recommend_parlay_structure(
            &candidates,
            budget,
            bankroll,
            RiskTolerance::from(risk),
            config.max_stake_pct,
        )?;
        println!(
            "{} risk: {} qualifying legs (min p {:.2}, max {} legs)",
            rec.risk, rec.qualified, rec.config.min_prob, rec.config.max_legs
        );
        match &rec.plan {
            Some(plan) => print_plan(plan.size, &plan.legs, plan.probability, plan.odds, plan.ev),
            None => println!("no qualifying picks"),
        }
        println!("stake           {:.2}", rec.stake);
        return Ok(());
    }

    let plan = if exhaustive {
        optimize_parlay_exhaustive(probs, odds, max_legs)?
    } else {
        optimize_parlay_size(probs, odds, max_legs)?
    };
    match plan {
        Some(plan) => print_plan(plan.size, &plan.legs, plan.probability, plan.odds, plan.ev),
        None => println!("no legs to combine"),
    }
    Ok(())
}

fn print_plan(size: usize, legs: &[usize], probability: f64, odds: f64, ev: f64) {
    let legs = legs.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    println!("legs            {} [{}]", size, legs);
    println!("probability     {:.2}%", probability * 100.0);
    println!("odds            {:.2}", odds);
    println!("ev              {:+.2}%", ev * 100.0);
}

fn print_pick(p: &ScoredPick) {
    println!(
        "{:<6} {:<24} {:<16} {} {:>7.1} (proj {:>6.1})  p {:>5.1}%  ev {:>+6.1}%  {}",
        p.pick.id,
        p.pick.player,
        p.pick.stat_type,
        p.score.direction,
        p.pick.line,
        p.pick.projection,
        p.score.win_probability * 100.0,
        p.score.ev_percent,
        p.score.role_tag
    );
}

fn print_slip_detail(m: &SlipMetrics) {
    println!("grade           {}", m.grade);
    println!("score           {:.1}", m.overall_score);
    println!("avg win prob    {:.2}%", m.avg_win_prob * 100.0);
    println!("avg ev          {:+.2}%", m.avg_ev);
    println!("correlation     {:.3}", m.correlation_sum);
    println!(
        "roles           {} anchor / {} low-variance / {} correlation (coverage {})",
        m.anchor_count, m.low_variance_count, m.correlation_count, m.role_coverage
    );
}

fn parse_day(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn local(day: NaiveDate, h: u32, m: u32, s: u32) -> std::result::Result<DateTime<Local>, String> {
    day.and_hms_opt(h, m, s)
        .and_then(|dt| dt.and_local_timezone(Local).earliest())
        .ok_or_else(|| format!("{day} has no local time {h:02}:{m:02}:{s:02}"))
}

fn parse_day_start(raw: &str) -> std::result::Result<DateTime<Local>, String> {
    local(parse_day(raw)?, 0, 0, 0)
}

/// Midnight after the given day, for an exclusive upper bound.
fn parse_day_after(raw: &str) -> std::result::Result<DateTime<Local>, String> {
    let day = parse_day(raw)?;
    let next = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| format!("{day} has no following day"))?;
    local(next, 0, 0, 0)
}

fn parse_leg(raw: &str) -> std::result::Result<SettleLeg, String> {
    let parts = raw.split(':').map(str::trim).collect::<Vec<_>>();
    if !(2..=3).contains(&parts.len()) {
        return Err(format!("expected LINE:ACTUAL[:over|under], got {raw:?}"));
    }
    let line = parts[0]
        .parse::<f64>()
        .map_err(|e| format!("line {:?}: {e}", parts[0]))?;
    let actual = match parts[1] {
        "-" | "" => None,
        v => Some(v.parse::<f64>().map_err(|e| format!("actual {v:?}: {e}"))?),
    };
    let direction = match parts.get(2) {
        Some(d) => Direction::parse(d).map_err(|e| e.to_string())?,
        None => Direction::Over,
    };
    Ok(SettleLeg {
        line,
        direction,
        actual,
    })
}
