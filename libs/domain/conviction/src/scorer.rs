// [libs/domain/conviction/src/scorer.rs]
/*!
 * =================================================================
 * APARATO: CONVICTION SCORER (V3.0 - DUAL PROFILE MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PUNTUACIÓN DETERMINISTA Y LIBRE DE EFECTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. HARD VETOES: Seis vetos en orden con cortocircuito; cualquier veto
 *    retorna scores en cero y razonamiento explicativo.
 * 2. DUAL SCORING: ordering (señal pura) vs permission (post-penalties
 *    y completitud de datos); el enrutamiento decide sobre permission.
 * 3. IDEMPOTENCE: misma entrada, salida byte-idéntica; sin reloj, sin
 *    aleatoriedad, sin E/S.
 * =================================================================
 */

use std::collections::{BTreeMap, BTreeSet};

use boar_domain_models::{
    ConvictionConfig, ConvictionScore, ConvictionWeights, EngineConfig, PlayType, PrimarySource,
    PulseStage, Recommendation, SignalInput, TradeConfig, WardenVerdict,
};

use crate::play_type::detect_play_type;

/// Contexto de ciclo que acompaña a la señal en la puntuación.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub pot_balance_sol: f64,
    pub volatility_factor: f64,
    /// Fracción derivada de cuántas fuentes respondieron este ciclo.
    pub data_completeness: f64,
    pub concentrated_volume: bool,
    pub dumper_wallet_count: u32,
    /// Oráculo presente y narrativa de <5 min: demasiado rápido.
    pub time_mismatch: bool,
    /// Beads AUTOPSY comprometidos (arranque en frío del Edge Bank).
    pub edge_bank_bead_count: u64,
    pub daily_graduation_count: u32,
    pub sol_price_usd: f64,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            pot_balance_sol: 0.0,
            volatility_factor: 1.0,
            data_completeness: 1.0,
            concentrated_volume: false,
            dumper_wallet_count: 0,
            time_mismatch: false,
            edge_bank_bead_count: 0,
            daily_graduation_count: 0,
            sol_price_usd: 78.0,
        }
    }
}

/// Motor de convicción. Construido una vez con la configuración sellada.
pub struct ConvictionScorer {
    conviction: ConvictionConfig,
    trade: TradeConfig,
}

impl ConvictionScorer {
    pub fn new(conviction: ConvictionConfig, trade: TradeConfig) -> Self {
        Self { conviction, trade }
    }

    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self::new(config.conviction.clone(), config.trade.clone())
    }

    fn weights_for(&self, play_type: PlayType) -> ConvictionWeights {
        match play_type {
            PlayType::Graduation => self.conviction.weights_graduation.clone(),
            PlayType::Accumulation => self.conviction.weights.clone(),
        }
    }

    fn auto_execute_threshold(&self, play_type: PlayType) -> i64 {
        match play_type {
            PlayType::Graduation => self.conviction.thresholds.auto_execute_graduation,
            PlayType::Accumulation => self.conviction.thresholds.auto_execute,
        }
    }

    // ── Componentes ──────────────────────────────────────────────────

    /// Acumulación de ballenas: +15 por ballena distinta, tope del perfil.
    fn score_smart_money_oracle(&self, whales: u32, max_points: i64) -> (i64, String) {
        if whales == 0 {
            return (0, "No whale accumulation detected".into());
        }
        let score = (whales as i64 * 15).min(max_points);
        if whales >= 3 {
            (score, format!("{whales} distinct whales accumulating (max points)"))
        } else {
            (score, format!("{whales} whale(s) detected (+15 each)"))
        }
    }

    /// Momentum social + volumen con gradiente y decaimiento por edad.
    ///
    /// Gradiente: 2x=5, 3x=10, 5x=15, 10x=20, 20x+=25. Decaimiento:
    /// puntos completos hasta 30 min, lineal a cero en 60 min.
    fn score_narrative_hunter(
        &self,
        volume_spike: f64,
        kol_detected: bool,
        age_minutes: i64,
        max_points: i64,
    ) -> (i64, String) {
        if volume_spike < 2.0 && !kol_detected {
            return (0, "No narrative momentum".into());
        }

        let base: i64 = if volume_spike >= 20.0 {
            25
        } else if volume_spike >= 10.0 {
            20
        } else if volume_spike >= 5.0 {
            15
        } else if volume_spike >= 3.0 {
            10
        } else if volume_spike >= 2.0 {
            5
        } else {
            0
        };

        let kol_bonus: i64 = if kol_detected { 10 } else { 0 };

        let decay_factor = if age_minutes <= 30 {
            1.0
        } else if age_minutes < 60 {
            1.0 - ((age_minutes - 30) as f64 / 30.0)
        } else {
            0.0
        };

        let score = (((base + kol_bonus) as f64 * decay_factor) as i64).min(max_points);

        let mut reasoning_parts: Vec<String> = Vec::new();
        if volume_spike >= 2.0 {
            reasoning_parts.push(format!("{volume_spike:.1}x volume spike"));
        }
        if kol_detected {
            reasoning_parts.push("KOL detected".into());
        }
        if age_minutes > 30 {
            reasoning_parts.push(format!("decayed ({age_minutes}min old)"));
        }
        let reasoning = if reasoning_parts.is_empty() {
            "No narrative signal".to_string()
        } else {
            reasoning_parts.join(", ")
        };

        (score, reasoning)
    }

    /// Warden: PASS peso completo; WARN 75% (graduation) o 50%
    /// (accumulation). Los tokens de launchpad disparan WARN por LP y
    /// concentración de forma esperada, no como bandera roja.
    fn score_rug_warden(
        &self,
        status: WardenVerdict,
        max_points: i64,
        play_type: PlayType,
    ) -> (i64, String) {
        match status {
            WardenVerdict::Pass => (max_points, "Rug Warden: PASS".into()),
            WardenVerdict::Warn => {
                let warn_fraction = match play_type {
                    PlayType::Graduation => 0.75,
                    PlayType::Accumulation => 0.5,
                };
                (
                    (max_points as f64 * warn_fraction) as i64,
                    format!("Rug Warden: WARN ({}% pts)", (warn_fraction * 100.0) as i64),
                )
            }
            other => (0, format!("Rug Warden: {}", other.as_str())),
        }
    }

    /// Patrón histórico: lineal de 70% (mitad de puntos) a 100%
    /// (completos); cero bajo 70%.
    fn score_edge_bank(&self, match_pct: f64, max_points: i64) -> (i64, String) {
        if match_pct < 70.0 {
            return (0, "No strong historical match".into());
        }
        let fraction = 0.5 + (match_pct - 70.0) / 60.0;
        let score = ((max_points as f64 * fraction) as i64).min(max_points);
        (score, format!("{match_pct:.0}% match to past winners"))
    }

    /// Calidad Pulse (perfil graduation): organic ratio escalonado,
    /// ghost metadata, pro traders, holders limpios y bono de bonding.
    fn score_pulse_quality(
        &self,
        signals: &SignalInput,
        max_points: i64,
    ) -> (i64, String, BTreeMap<String, i64>) {
        let mut score: i64 = 0;
        let mut reasoning_parts: Vec<String> = Vec::new();
        let mut breakdown_extra: BTreeMap<String, i64> = BTreeMap::new();

        let organic_points: i64 = if signals.pulse_organic_ratio >= 0.7 {
            15
        } else if signals.pulse_organic_ratio >= 0.5 {
            10
        } else if signals.pulse_organic_ratio >= 0.3 {
            5
        } else {
            0
        };
        score += organic_points;
        breakdown_extra.insert("pulse_organic".into(), organic_points);
        if organic_points > 0 {
            reasoning_parts.push(format!("organic {:.0}%", signals.pulse_organic_ratio * 100.0));
        }

        if signals.pulse_ghost_metadata {
            score += 5;
            breakdown_extra.insert("pulse_ghost".into(), 5);
            reasoning_parts.push("ghost metadata".into());
        }

        let pro_trader_points: i64 = if signals.pulse_pro_trader_pct > 10.0 {
            10
        } else if signals.pulse_pro_trader_pct > 5.0 {
            5
        } else {
            0
        };
        score += pro_trader_points;
        breakdown_extra.insert("pulse_pro_trader".into(), pro_trader_points);
        if pro_trader_points > 0 {
            reasoning_parts.push(format!("pro traders {:.1}%", signals.pulse_pro_trader_pct));
        }

        if signals.pulse_bundler_pct < 5.0 {
            score += 5;
            breakdown_extra.insert("pulse_clean_holders".into(), 5);
            reasoning_parts.push("clean holders".into());
        }

        // Bono de etapa: bonding (pre-graduación) es la jugada. Bonded
        // (post-graduación) jamás recibe bono; su veto corre antes.
        let bonding_bonus = self.conviction.graduation.bonded_stage_bonus;
        if signals.pulse_stage == PulseStage::Bonding && bonding_bonus > 0 {
            score += bonding_bonus;
            breakdown_extra.insert("pulse_bonding_bonus".into(), bonding_bonus);
            reasoning_parts.push(format!("bonding +{bonding_bonus}"));
        }

        let score = score.min(max_points);
        let reasoning = if reasoning_parts.is_empty() {
            "Pulse: no quality signals".to_string()
        } else {
            format!("Pulse: {}", reasoning_parts.join(", "))
        };

        (score, reasoning, breakdown_extra)
    }

    /// Tamaño de posición: (permission/100) x pote x multiplicador /
    /// volatilidad, acotado por max_position_pct y, en graduation, por
    /// max_position_usd convertido a SOL.
    pub fn calculate_position_size(
        &self,
        permission_score: i64,
        pot_balance_sol: f64,
        volatility_factor: f64,
        play_type: PlayType,
        sol_price_usd: f64,
    ) -> f64 {
        let base_size = (permission_score as f64 / 100.0)
            * (pot_balance_sol * self.conviction.sizing.base_multiplier);
        let adjusted_size = base_size / volatility_factor.max(f64::MIN_POSITIVE);

        let max_size = pot_balance_sol * (self.trade.max_position_pct / 100.0);
        let mut size = adjusted_size.min(max_size);

        if play_type == PlayType::Graduation {
            let graduation_max_sol = if sol_price_usd > 0.0 {
                self.conviction.graduation.max_position_usd / sol_price_usd
            } else {
                0.65
            };
            size = size.min(graduation_max_sol);
        }

        size
    }

    // ── Puntuación completa ──────────────────────────────────────────

    /// Calcula el veredicto de convicción con enrutamiento por tipo de
    /// jugada: perfil de pesos, umbral y tope de posición propios.
    pub fn score(&self, signals: &SignalInput, context: &ScoringContext) -> ConvictionScore {
        let mut breakdown: BTreeMap<String, i64> = BTreeMap::new();
        let mut red_flags: BTreeMap<String, i64> = BTreeMap::new();
        let mut primary_sources: BTreeSet<PrimarySource> = BTreeSet::new();
        let mut reasoning_parts: Vec<String> = Vec::new();

        let play_type = detect_play_type(signals);

        // ── VETOS DUROS (cortocircuito, en orden) ───────────────────

        // VETO 1: Warden FAIL.
        if signals.rug_warden_status == WardenVerdict::Fail {
            let mut verdict =
                ConvictionScore::veto(play_type, "VETO: Rug Warden FAIL (RUG-WARDEN-VETO)");
            verdict.breakdown.insert("rug_warden".into(), 0);
            return verdict;
        }

        // VETO 2: token demasiado nuevo para descubrimiento orgánico.
        if signals.narrative_age_minutes < 2 && signals.narrative_volume_spike >= 5.0 {
            return ConvictionScore::veto(
                play_type,
                "VETO: Token created <2min ago (too new for organic discovery)",
            );
        }

        // VETO 3: deployer serial (el peor patrón de rug por histórico).
        if signals.pulse_deployer_migrations > 5 {
            let mut verdict = ConvictionScore::veto(
                play_type,
                format!(
                    "VETO: Serial deployer ({} prior migrations, rug trap pattern)",
                    signals.pulse_deployer_migrations
                ),
            );
            verdict.red_flags.insert("pulse_serial_deployer".into(), -100);
            return verdict;
        }

        // VETO 4: token post-bonding (el dinero rápido ya salió).
        if signals.pulse_stage == PulseStage::Bonded {
            let mut verdict = ConvictionScore::veto(
                play_type,
                "VETO: Post-bonding token (historical loss pattern, fast money already exited)",
            );
            verdict.red_flags.insert("pulse_post_bonding".into(), -100);
            return verdict;
        }

        // VETO 5: sublímite diario de jugadas graduation.
        let graduation_daily_cap = self.conviction.graduation.max_daily_plays;
        if play_type == PlayType::Graduation
            && context.daily_graduation_count >= graduation_daily_cap
        {
            return ConvictionScore::veto(
                play_type,
                format!(
                    "VETO: Graduation daily limit reached ({}/{})",
                    context.daily_graduation_count, graduation_daily_cap
                ),
            );
        }

        // VETO 6: mcap fuera del rango micro-cap de una jugada de velocidad.
        let graduation_mcap_ceiling = self.conviction.graduation.max_mcap_graduation;
        if play_type == PlayType::Graduation
            && signals.entry_market_cap_usd > graduation_mcap_ceiling
        {
            return ConvictionScore::veto(
                play_type,
                format!(
                    "VETO: Graduation mcap ${:.0} > ${:.0} cap",
                    signals.entry_market_cap_usd, graduation_mcap_ceiling
                ),
            );
        }

        // ── Perfil de pesos y arranque en frío del Edge Bank ────────

        let mut weights = self.weights_for(play_type);
        let edge_bank_active =
            context.edge_bank_bead_count >= self.conviction.edge_bank_min_beads;
        let mut cold_start_bonus: i64 = 0;
        if !edge_bank_active {
            // Sin historial suficiente, los puntos del Edge Bank se
            // redistribuyen al warden.
            cold_start_bonus = weights.edge_bank;
            weights.rug_warden += cold_start_bonus;
            weights.edge_bank = 0;
        }

        // ── COMPONENTES ──────────────────────────────────────────────

        match play_type {
            PlayType::Graduation => {
                // PERFIL GRADUATION: la calidad Pulse es la señal primaria.
                let (pulse_score, pulse_reason, pulse_extra) =
                    self.score_pulse_quality(signals, weights.pulse_quality);
                breakdown.insert("pulse_quality".into(), pulse_score);
                breakdown.extend(pulse_extra);
                reasoning_parts.push(pulse_reason);
                if pulse_score >= 15 {
                    primary_sources.insert(PrimarySource::Pulse);
                }

                let (narrative_score, narrative_reason) = self.score_narrative_hunter(
                    signals.narrative_volume_spike,
                    signals.narrative_kol_detected,
                    signals.narrative_age_minutes,
                    weights.narrative_hunter,
                );
                breakdown.insert("narrative_hunter".into(), narrative_score);
                reasoning_parts.push(format!("Narrative: {narrative_reason}"));
                if signals.narrative_volume_spike >= 3.0 {
                    primary_sources.insert(PrimarySource::Narrative);
                }

                let (warden_score, warden_reason) = self.score_rug_warden(
                    signals.rug_warden_status,
                    weights.rug_warden,
                    PlayType::Graduation,
                );
                breakdown.insert("rug_warden".into(), warden_score);
                reasoning_parts.push(format!("Warden: {warden_reason}"));
                if matches!(signals.rug_warden_status, WardenVerdict::Pass | WardenVerdict::Warn) {
                    primary_sources.insert(PrimarySource::Warden);
                }

                // Oráculo estructuralmente cero en graduation (neutral).
                breakdown.insert("smart_money_oracle".into(), 0);

                if edge_bank_active {
                    let (edge_score, edge_reason) =
                        self.score_edge_bank(signals.edge_bank_match_pct, weights.edge_bank);
                    breakdown.insert("edge_bank".into(), edge_score);
                    reasoning_parts.push(format!("Edge: {edge_reason}"));
                } else {
                    breakdown.insert("edge_bank".into(), 0);
                    reasoning_parts.push(format!("Edge: cold start (warden +{cold_start_bonus}pts)"));
                }

                reasoning_parts.insert(0, "[GRADUATION]".into());
            }
            PlayType::Accumulation => {
                // PERFIL ACCUMULATION: el oráculo es la señal primaria.
                let (oracle_score, oracle_reason) =
                    self.score_smart_money_oracle(signals.smart_money_whales, weights.smart_money_oracle);
                breakdown.insert("smart_money_oracle".into(), oracle_score);
                reasoning_parts.push(format!("Oracle: {oracle_reason}"));
                if signals.smart_money_whales >= 1 {
                    primary_sources.insert(PrimarySource::Oracle);
                }

                let (narrative_score, narrative_reason) = self.score_narrative_hunter(
                    signals.narrative_volume_spike,
                    signals.narrative_kol_detected,
                    signals.narrative_age_minutes,
                    weights.narrative_hunter,
                );
                breakdown.insert("narrative_hunter".into(), narrative_score);
                reasoning_parts.push(format!("Narrative: {narrative_reason}"));
                if signals.narrative_volume_spike >= 3.0 {
                    primary_sources.insert(PrimarySource::Narrative);
                }

                // PASS cuenta como fuente primaria (habilita convergencia).
                let (warden_score, warden_reason) = self.score_rug_warden(
                    signals.rug_warden_status,
                    weights.rug_warden,
                    PlayType::Accumulation,
                );
                breakdown.insert("rug_warden".into(), warden_score);
                reasoning_parts.push(format!("Warden: {warden_reason}"));
                if signals.rug_warden_status == WardenVerdict::Pass {
                    primary_sources.insert(PrimarySource::Warden);
                }

                if edge_bank_active {
                    let (edge_score, edge_reason) =
                        self.score_edge_bank(signals.edge_bank_match_pct, weights.edge_bank);
                    breakdown.insert("edge_bank".into(), edge_score);
                    reasoning_parts.push(format!("Edge: {edge_reason}"));
                } else {
                    breakdown.insert("edge_bank".into(), 0);
                    reasoning_parts.push(format!("Edge: cold start (warden +{cold_start_bonus}pts)"));
                }
            }
        }

        // ORDERING: fuerza de señal pura. Los sub-componentes pulse_*
        // quedan fuera (ya agregados dentro de pulse_quality).
        let mut ordering_score: i64 = breakdown
            .iter()
            .filter(|(key, _)| !key.starts_with("pulse_") || key.as_str() == "pulse_quality")
            .map(|(_, value)| value)
            .sum();

        // PERMISSION: parte de ordering y aplica penalizaciones.
        let mut permission_score = ordering_score;

        // ── BANDERAS ROJAS ───────────────────────────────────────────

        // BANDERA 1: volumen concentrado.
        if context.concentrated_volume {
            red_flags.insert("concentrated_volume".into(), -15);
            permission_score -= 15;
            reasoning_parts.push("RED FLAG: Concentrated volume (-15 pts)".into());
        }

        // BANDERA 2: billeteras dumper. Todas dumper = veto terminal.
        if context.dumper_wallet_count > 0 {
            if context.dumper_wallet_count >= signals.smart_money_whales
                && signals.smart_money_whales > 0
            {
                return ConvictionScore {
                    ordering_score,
                    permission_score: 0,
                    breakdown,
                    red_flags,
                    primary_sources,
                    recommendation: Recommendation::Veto,
                    position_size_sol: 0.0,
                    reasoning: format!(
                        "All {} whale(s) are known dumpers (trade vetoed)",
                        context.dumper_wallet_count
                    ),
                    play_type,
                };
            }
            let penalty: i64 = if context.dumper_wallet_count == 1 { 15 } else { 30 };
            red_flags.insert("dumper_wallets".into(), -penalty);
            permission_score -= penalty;
            reasoning_parts.push(format!(
                "RED FLAG: {} dumper wallet(s) (-{penalty} pts)",
                context.dumper_wallet_count
            ));
        }

        // BANDERA 3: concentración de billeteras frescas.
        if signals.fresh_wallet_inflow_usd > 50_000.0 {
            red_flags.insert("fresh_wallet_concentration".into(), -10);
            permission_score -= 10;
            reasoning_parts.push(format!(
                "RED FLAG: Fresh wallet inflow ${:.0} (-10 pts)",
                signals.fresh_wallet_inflow_usd
            ));
        }

        // BANDERA 4: flujo neto hacia exchanges (patrón de distribución).
        if signals.exchange_net_inflow_usd > 0.0 {
            red_flags.insert("exchange_inflow".into(), -10);
            permission_score -= 10;
            reasoning_parts.push(format!(
                "RED FLAG: Exchange inflow ${:.0}, distribution pattern (-10 pts)",
                signals.exchange_net_inflow_usd
            ));
        }

        // BANDERA 4b: pico de volumen sin confirmación social (leve).
        if play_type == PlayType::Accumulation
            && signals.narrative_volume_spike >= 20.0
            && !signals.narrative_kol_detected
        {
            red_flags.insert("unsocialized_volume".into(), -5);
            permission_score -= 5;
            reasoning_parts.push(format!(
                "MILD FLAG: {:.0}x volume spike with no social confirmation (-5 pts)",
                signals.narrative_volume_spike
            ));
        }

        // BANDERA 5: amortiguación por divergencia oráculo/narrativa.
        if signals.smart_money_whales >= 2
            && signals.narrative_volume_spike < 2.0
            && !signals.narrative_kol_detected
        {
            red_flags.insert("divergence_damping".into(), -25);
            permission_score -= 25;
            reasoning_parts.push(format!(
                "S2 DAMPING: {} whales but no narrative momentum (-25 pts)",
                signals.smart_money_whales
            ));
        }

        // BANDERAS PULSE (ambos tipos de jugada).
        if signals.pulse_organic_ratio < 0.3 && signals.pulse_organic_ratio > 0.0 {
            red_flags.insert("pulse_low_organic".into(), -10);
            permission_score -= 10;
            reasoning_parts.push(format!(
                "PULSE RED FLAG: Organic ratio {:.2} (-10 pts)",
                signals.pulse_organic_ratio
            ));
        }

        if signals.pulse_bundler_pct > 20.0 {
            red_flags.insert("pulse_bundler".into(), -10);
            permission_score -= 10;
            reasoning_parts.push(format!(
                "PULSE RED FLAG: Bundlers {:.1}% (-10 pts)",
                signals.pulse_bundler_pct
            ));
        }

        if signals.pulse_sniper_pct > 30.0 {
            red_flags.insert("pulse_sniper".into(), -10);
            permission_score -= 10;
            reasoning_parts.push(format!(
                "PULSE RED FLAG: Snipers {:.1}% (-10 pts)",
                signals.pulse_sniper_pct
            ));
        }

        // ZONA DE CAUTELA FDV: graduation entre $25k y $100k.
        if play_type == PlayType::Graduation
            && signals.entry_market_cap_usd > 25_000.0
            && signals.entry_market_cap_usd < 100_000.0
        {
            red_flags.insert("fdv_death_zone".into(), -5);
            permission_score -= 5;
            reasoning_parts.push(format!(
                "FDV CAUTION: ${:.0} (graduation $25k-100k zone, -5 pts)",
                signals.entry_market_cap_usd
            ));
        }

        // BONOS PULSE en accumulation (graduation los integra en pulse_quality).
        if play_type == PlayType::Accumulation {
            if signals.pulse_ghost_metadata {
                breakdown.insert("pulse_ghost".into(), 5);
                ordering_score += 5;
                permission_score += 5;
                reasoning_parts.push("PULSE BONUS: Ghost metadata (+5 pts)".into());
            }

            if signals.pulse_pro_trader_pct > 10.0 {
                breakdown.insert("pulse_pro_trader".into(), 5);
                ordering_score += 5;
                permission_score += 5;
                reasoning_parts.push(format!(
                    "PULSE BONUS: Pro traders {:.1}% (+5 pts)",
                    signals.pulse_pro_trader_pct
                ));
            }

            if signals.pulse_pro_trader_pct > 10.0 && signals.pulse_organic_ratio >= 0.3 {
                primary_sources.insert(PrimarySource::Pulse);
            }
        }

        // BONOS DE ENRIQUECIMIENTO (solo impulsan, jamás penalizan).
        if signals.holder_delta_pct > 20.0 {
            breakdown.insert("enrichment_holder_growth".into(), 5);
            ordering_score += 5;
            permission_score += 5;
            reasoning_parts.push(format!(
                "ENRICHMENT: Rapid holder growth {:.0}% (+5 pts)",
                signals.holder_delta_pct
            ));
        }

        if signals.pulse_trending_score > 100.0 {
            let bonus: i64 = if signals.pulse_trending_score <= 1000.0 { 5 } else { 8 };
            breakdown.insert("enrichment_trending".into(), bonus);
            ordering_score += bonus;
            permission_score += bonus;
            reasoning_parts.push(format!(
                "ENRICHMENT: Trending score={:.0} (+{bonus} pts)",
                signals.pulse_trending_score
            ));
        }

        if signals.pulse_dexscreener_boosted {
            breakdown.insert("enrichment_ds_boosted".into(), 5);
            ordering_score += 5;
            permission_score += 5;
            reasoning_parts.push("ENRICHMENT: DexScreener boosted (+5 pts)".into());
        }

        // Penalización por completitud de datos.
        permission_score = (permission_score as f64 * context.data_completeness) as i64;
        if context.data_completeness < 1.0 {
            reasoning_parts
                .push(format!("Data completeness: {:.0}%", context.data_completeness * 100.0));
        }

        // ── ENRUTAMIENTO ─────────────────────────────────────────────

        // Compuerta de permiso: AUTO_EXECUTE exige >=2 fuentes primarias.
        // Graduation la omite: es jugada de velocidad y Pulse + Warden
        // PASS bastan; exigir dos fuentes bloquearía casi todo.
        let primary_count = primary_sources.len();
        let auto_threshold = self.auto_execute_threshold(play_type);

        let mut recommendation = if permission_score >= auto_threshold {
            if play_type == PlayType::Graduation || primary_count >= 2 {
                Recommendation::AutoExecute
            } else {
                reasoning_parts.push(format!(
                    "PERMISSION GATE: Only {primary_count} primary source(s), need >=2 for AUTO_EXECUTE"
                ));
                Recommendation::Watchlist
            }
        } else if permission_score >= self.conviction.thresholds.watchlist {
            Recommendation::Watchlist
        } else if permission_score >= self.conviction.thresholds.paper_trade {
            Recommendation::PaperTrade
        } else {
            Recommendation::Discard
        };

        // Degradación por desfase temporal: oráculo + narrativa <5 min.
        if context.time_mismatch {
            match recommendation {
                Recommendation::AutoExecute => {
                    recommendation = Recommendation::Watchlist;
                    reasoning_parts.push(
                        "TIME MISMATCH: Oracle + Narrative <5min -> downgraded to WATCHLIST".into(),
                    );
                }
                Recommendation::Watchlist => {
                    recommendation = Recommendation::Discard;
                    reasoning_parts.push(
                        "TIME MISMATCH: Oracle + Narrative <5min -> downgraded to DISCARD".into(),
                    );
                }
                _ => {}
            }
        }

        let position_size_sol = self.calculate_position_size(
            permission_score,
            context.pot_balance_sol,
            context.volatility_factor,
            play_type,
            context.sol_price_usd,
        );

        ConvictionScore {
            ordering_score,
            permission_score,
            breakdown,
            red_flags,
            primary_sources,
            recommendation,
            position_size_sol,
            reasoning: reasoning_parts.join(" | "),
            play_type,
        }
    }
}
