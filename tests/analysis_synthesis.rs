use std::f64::consts::PI;

use jsptk::{
    AnalysisConfig, FilterConfig, MgcepAnalyzer, StabilityChecker, StabilityConfig, Synthesizer,
    analysis::{Convergence, InputType},
    cepstrum::MelGeneralizedCepstrum,
    filter::{Direction, PadeOrder},
};
use rand::{Rng, SeedableRng};

const FFT_LEN: usize = 256;
const ORDER: usize = 12;
const ALPHA: f64 = 0.35;

/// Half periodogram of `2 / (1 - 0.5 z^-1)`.
fn single_pole() -> Vec<f64> {
    (0..=FFT_LEN / 2)
        .map(|k| {
            let w = 2.0 * PI * k as f64 / FFT_LEN as f64;
            4.0 / (1.25 - w.cos())
        })
        .collect()
}

fn analyze(gamma: f64) -> (Vec<f64>, Convergence) {
    let mut analyzer = MgcepAnalyzer::new(&AnalysisConfig {
        order: ORDER,
        alpha: ALPHA,
        gamma,
        fft_len: FFT_LEN,
        input: InputType::Periodogram,
        ..Default::default()
    })
    .unwrap();
    let analysis = analyzer.analyze(&single_pole()).unwrap();
    (analysis.coefficients, analysis.convergence)
}

#[test]
fn mel_cepstrum_of_single_pole() {
    let (mcep, convergence) = analyze(0.0);
    assert_eq!(convergence, Convergence::Converged);
    let cepstrum = MelGeneralizedCepstrum::new(&mcep, ALPHA, 0.0)
        .mgc2mgc(30, 0.0, 0.0)
        .unwrap();
    approx::assert_abs_diff_eq!(cepstrum[0], 2f64.ln(), epsilon = 1.0e-4);
    for (n, c) in cepstrum.iter().enumerate().skip(1) {
        approx::assert_abs_diff_eq!(*c, 0.5f64.powi(n as i32) / n as f64, epsilon = 1.0e-4);
    }
}

#[test]
fn mlsa_reproduces_impulse_response() {
    let (mut mcep, _) = analyze(0.0);

    let mut checker = StabilityChecker::new(&StabilityConfig {
        order: ORDER,
        alpha: ALPHA,
        fft_len: FFT_LEN,
        pade: PadeOrder::Five,
        ..Default::default()
    })
    .unwrap();
    assert!(checker.check(&mut mcep).unwrap().stable);

    let mut config = FilterConfig::default();
    config.set_order(ORDER);
    config.set_alpha(ALPHA);
    config.set_pade(PadeOrder::Five);
    config.set_fperiod(40);
    let mut synthesizer = Synthesizer::new(&config).unwrap();

    let mut impulse = [0.0; 40];
    impulse[0] = 1.0;
    let mut output = [0.0; 40];
    // the first frame opens the block, the second one closes it
    assert!(!synthesizer.synthesize(&mcep, &[0.0; 40], &mut output).unwrap());
    assert!(synthesizer.synthesize(&mcep, &impulse, &mut output).unwrap());
    for (n, y) in output.iter().enumerate() {
        approx::assert_abs_diff_eq!(*y, 2.0 * 0.5f64.powi(n as i32), epsilon = 1.0e-3);
    }
}

#[test]
fn mglsa_inverse_recovers_excitation() {
    let (mgcep, _) = analyze(-0.5);
    let mut flattened = mgcep.clone();
    flattened[1..].iter_mut().for_each(|c| *c *= 0.5);
    let frames = [mgcep.clone(), flattened, mgcep];

    let mut config = FilterConfig::default();
    config.set_order(ORDER);
    config.set_alpha(ALPHA);
    config.set_stage(2);
    config.set_fperiod(80);
    config.set_iperiod(4);
    // a time-varying gain does not commute with the cascade
    config.set_without_gain(true);
    let mut inverse = config.clone();
    inverse.set_direction(Direction::Inverse);

    let mut synthesizer = Synthesizer::new(&config).unwrap();
    let mut inverse_filter = Synthesizer::new(&inverse).unwrap();

    let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(0x5eed);
    let mut speech = [0.0; 80];
    let mut residual = [0.0; 80];
    let mut blocks = 0;
    for frame in &frames {
        let excitation: Vec<f64> = (0..80).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let filtered = synthesizer
            .synthesize(frame, &excitation, &mut speech)
            .unwrap();
        assert_eq!(
            inverse_filter
                .synthesize(frame, &speech, &mut residual)
                .unwrap(),
            filtered
        );
        if filtered {
            blocks += 1;
            for (r, e) in residual.iter().zip(&excitation) {
                approx::assert_abs_diff_eq!(r, e, epsilon = 1.0e-8);
            }
        }
    }
    assert_eq!(blocks, frames.len() - 1);
}
