/// A Butcher tableau for an explicit Runge-Kutta method with `STAGES` stages.
///
/// `b2`, when present, holds the embedded lower-order solution weights; the
/// error estimate is the weighted difference `b - b2` applied to the stage
/// slopes (see [`ButcherTableau::err_weights`]).
pub struct ButcherTableau<const STAGES: usize> {
    pub a: [[f64; STAGES]; STAGES],
    pub b: [f64; STAGES],
    pub b2: Option<[f64; STAGES]>,
    pub c: [f64; STAGES],
    pub order: usize,
    pub fsal: bool,
}

impl<const STAGES: usize> ButcherTableau<STAGES> {
    pub fn err_weights(&self) -> Option<[f64; STAGES]> {
        let b2 = self.b2?;
        let mut out = [0.0; STAGES];
        for i in 0..STAGES {
            out[i] = self.b[i] - b2[i];
        }
        Some(out)
    }
}

impl ButcherTableau<1> {
    pub const EULER: Self = Self {
        a: [[0.0]],
        b: [1.0],
        b2: None,
        c: [0.0],
        order: 1,
        fsal: false,
    };
}

impl ButcherTableau<4> {
    pub const RK4: Self = Self {
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 1. / 2., 0., 0.],
            [0., 0., 1., 0.],
        ],
        b: [1. / 6., 1. / 3., 1. / 3., 1. / 6.],
        b2: None,
        c: [0., 1.0 / 2.0, 1.0 / 2.0, 1.0],
        order: 4,
        fsal: false,
    };
}

impl ButcherTableau<7> {
    // usage: ButcherTableau::<7>::DORMAND_PRINCE_45
    pub const DORMAND_PRINCE_45: Self = Self {
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [1. / 5., 0., 0., 0., 0., 0., 0.],
            [3. / 40., 9. / 40., 0., 0., 0., 0., 0.],
            [44. / 45., -56. / 15., 32. / 9., 0., 0., 0., 0.],
            [
                19372. / 6561.,
                -25360. / 2187.,
                64448. / 6561.,
                -212. / 729.,
                0.,
                0.,
                0.,
            ],
            [
                9017. / 3168.,
                -355. / 33.,
                46732. / 5247.,
                49. / 176.,
                -5103. / 18656.,
                0.,
                0.,
            ],
            [
                35. / 384.,
                0.,
                500. / 1113.,
                125. / 192.,
                -2187. / 6784.,
                11. / 84.,
                0.,
            ],
        ],
        b: [
            35. / 384.,
            0.,
            500. / 1113.,
            125. / 192.,
            -2187. / 6784.,
            11. / 84.,
            0.,
        ],
        b2: Some([
            5179. / 57600.,
            0.,
            7571. / 16695.,
            393. / 640.,
            -92097. / 339200.,
            187. / 2100.,
            1. / 40.,
        ]),
        c: [0., 1. / 5., 3. / 10., 4. / 5., 8. / 9., 1.0, 1.0],
        order: 5,
        fsal: true,
    };

    // usage: ButcherTableau::<7>::TSITOURAS_45
    pub const TSITOURAS_45: Self = Self {
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [0.161, 0., 0., 0., 0., 0., 0.],
            [-0.008480655492356989, 0.335480655492357, 0., 0., 0., 0., 0.],
            [
                2.8971530571054935,
                -6.359448489975075,
                4.3622954328695815,
                0.,
                0.,
                0.,
                0.,
            ],
            [
                5.325864828439257,
                -11.748883564062828,
                7.4955393428898365,
                -0.09249506636175525,
                0.,
                0.,
                0.,
            ],
            [
                5.86145544294642,
                -12.92096931784711,
                8.159367898576159,
                -0.071584973281401,
                -0.028269050394068383,
                0.,
                0.,
            ],
            [
                0.09646076681806523,
                0.01,
                0.4798896504144996,
                1.379008574103742,
                -3.290069515436081,
                2.324710524099774,
                0.,
            ],
        ],
        b: [
            0.09646076681806523,
            0.01,
            0.4798896504144996,
            1.379008574103742,
            -3.290069515436081,
            2.324710524099774,
            0.,
        ],
        b2: Some([
            0.09468075576583923,
            0.009183565540343,
            0.4877705284247616,
            1.234297566930479,
            -2.707712349983526,
            1.866628418170587,
            -0.015151515151515152,
        ]),
        c: [0., 0.161, 0.327, 0.9, 0.9800255409045097, 1.0, 1.0],
        order: 5,
        fsal: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_consistency<const S: usize>(t: &ButcherTableau<S>) {
        let row_sum: f64 = t.b.iter().sum();
        assert_relative_eq!(row_sum, 1.0, epsilon = 1e-12);
        for i in 0..S {
            let row_sum: f64 = t.a[i].iter().sum();
            assert_relative_eq!(row_sum, t.c[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn rk4_is_consistent() {
        check_consistency(&ButcherTableau::<4>::RK4);
    }

    #[test]
    fn dopri5_is_consistent() {
        check_consistency(&ButcherTableau::<7>::DORMAND_PRINCE_45);
        assert!(ButcherTableau::<7>::DORMAND_PRINCE_45.fsal);
    }

    #[test]
    fn tsit5_is_consistent() {
        check_consistency(&ButcherTableau::<7>::TSITOURAS_45);
        assert!(ButcherTableau::<7>::TSITOURAS_45.fsal);
    }

    #[test]
    fn err_weights_vanish_without_embedded_row() {
        assert!(ButcherTableau::<4>::RK4.err_weights().is_none());
    }
}
