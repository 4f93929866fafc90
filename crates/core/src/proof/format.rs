//! Proof, public signal and verification key formats
//!
//! All three travel as JSON in the layout snarkjs writes: affine coordinates
//! as decimal strings with a trailing projective `z`, G2 coordinates as
//! `[c0, c1]` pairs. The Solidity verifier takes the G2 pairs in the
//! opposite order, see [`reshape_pi_b`].

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_groth16::{Proof, VerifyingKey};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use super::signal;
use crate::encoding::{
    biguint_to_field, field_from_decimal, field_to_decimal, parse_decimal, EncodingError,
};
use crate::error::ProofError;

pub const PROTOCOL: &str = "groth16";
pub const CURVE: &str = "bn128";

/// Projective G1 coordinates `[x, y, z]`
pub type G1Json = [String; 3];

/// Projective G2 coordinates `[[x.c0, x.c1], [y.c0, y.c1], [z.c0, z.c1]]`
pub type G2Json = [[String; 2]; 3];

/// Groth16 proof in snarkjs layout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: G1Json,
    pub pi_b: G2Json,
    pub pi_c: G1Json,
    pub protocol: String,
    pub curve: String,
}

impl Groth16Proof {
    pub fn from_arkworks(proof: &Proof<Bn254>) -> Self {
        Self {
            pi_a: g1_to_json(&proof.a),
            pi_b: g2_to_json(&proof.b),
            pi_c: g1_to_json(&proof.c),
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        }
    }

    /// Decode into an arkworks proof.
    ///
    /// `Ok(None)` means the coordinates are well-formed decimals but do not
    /// describe valid curve points, which verifies as false rather than
    /// erroring.
    pub fn to_arkworks(&self) -> Result<Option<Proof<Bn254>>, ProofError> {
        let (a, b, c) = match (
            g1_from_json(&self.pi_a)?,
            g2_from_json(&self.pi_b)?,
            g1_from_json(&self.pi_c)?,
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Ok(None),
        };
        Ok(Some(Proof { a, b, c }))
    }

    /// Reshape for a Solidity verifier contract
    pub fn to_solidity(&self) -> SolidityProof {
        SolidityProof {
            a: [self.pi_a[0].clone(), self.pi_a[1].clone()],
            b: reshape_pi_b(&self.pi_b),
            c: [self.pi_c[0].clone(), self.pi_c[1].clone()],
        }
    }
}

/// Proof arguments as a Solidity Groth16 verifier takes them
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidityProof {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

impl SolidityProof {
    /// Undo [`Groth16Proof::to_solidity`]
    pub fn to_groth16(&self) -> Groth16Proof {
        let [x, y] = swap_pairs(&self.b);
        Groth16Proof {
            pi_a: [self.a[0].clone(), self.a[1].clone(), "1".to_string()],
            pi_b: [x, y, ["1".to_string(), "0".to_string()]],
            pi_c: [self.c[0].clone(), self.c[1].clone(), "1".to_string()],
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        }
    }
}

/// Drop the projective row of `pi_b` and swap each coordinate pair:
/// `[[b00, b01], [b10, b11], _]` becomes `[[b01, b00], [b11, b10]]`.
pub fn reshape_pi_b(pi_b: &G2Json) -> [[String; 2]; 2] {
    swap_pairs(&[pi_b[0].clone(), pi_b[1].clone()])
}

/// Swap the two limbs of each pair; applying it twice is the identity
pub fn swap_pairs(pairs: &[[String; 2]; 2]) -> [[String; 2]; 2] {
    [
        [pairs[0][1].clone(), pairs[0][0].clone()],
        [pairs[1][1].clone(), pairs[1][0].clone()],
    ]
}

/// Ordered public outputs of a transfer proof
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignals(Vec<String>);

impl PublicSignals {
    pub fn from_fields(fields: &[Fr]) -> Self {
        Self(fields.iter().map(field_to_decimal).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// Signal `index` as an integer
    pub fn get(&self, index: usize) -> Result<BigUint, ProofError> {
        let raw = self.0.get(index).ok_or(ProofError::SignalCount {
            expected: index + 1,
            got: self.0.len(),
        })?;
        parse_decimal(raw).map_err(|e| ProofError::Parse(e.to_string()))
    }

    pub fn encrypted_sender_balance(&self) -> Result<BigUint, ProofError> {
        self.get(signal::ENCRYPTED_SENDER_BALANCE)
    }

    pub fn encrypted_sender_value(&self) -> Result<BigUint, ProofError> {
        self.get(signal::ENCRYPTED_SENDER_VALUE)
    }

    pub fn encrypted_receiver_value(&self) -> Result<BigUint, ProofError> {
        self.get(signal::ENCRYPTED_RECEIVER_VALUE)
    }

    pub fn auth_commitment(&self) -> Result<BigUint, ProofError> {
        self.get(signal::AUTH_COMMITMENT)
    }

    /// Decode as scalar field elements.
    ///
    /// `Ok(None)` if some signal is a valid integer outside the field.
    pub fn to_fields(&self) -> Result<Option<Vec<Fr>>, ProofError> {
        let mut fields = Vec::with_capacity(self.0.len());
        for raw in &self.0 {
            match field_from_decimal::<Fr>(raw) {
                Ok(f) => fields.push(f),
                Err(EncodingError::OutOfField) => return Ok(None),
                Err(e) => return Err(ProofError::Parse(e.to_string())),
            }
        }
        Ok(Some(fields))
    }

    /// Fixed-width copy for a ledger call
    pub fn to_array(&self) -> Result<[String; signal::COUNT], ProofError> {
        self.0
            .clone()
            .try_into()
            .map_err(|v: Vec<String>| ProofError::SignalCount {
                expected: signal::COUNT,
                got: v.len(),
            })
    }
}

impl From<Vec<String>> for PublicSignals {
    fn from(signals: Vec<String>) -> Self {
        Self(signals)
    }
}

impl From<[String; signal::COUNT]> for PublicSignals {
    fn from(signals: [String; signal::COUNT]) -> Self {
        Self(signals.to_vec())
    }
}

/// Groth16 verification key in snarkjs layout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKeyJson {
    pub protocol: String,
    pub curve: String,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk_alpha_1: G1Json,
    pub vk_beta_2: G2Json,
    pub vk_gamma_2: G2Json,
    pub vk_delta_2: G2Json,
    #[serde(rename = "IC")]
    pub ic: Vec<G1Json>,
}

impl VerificationKeyJson {
    pub fn from_arkworks(vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
            n_public: vk.gamma_abc_g1.len().saturating_sub(1),
            vk_alpha_1: g1_to_json(&vk.alpha_g1),
            vk_beta_2: g2_to_json(&vk.beta_g2),
            vk_gamma_2: g2_to_json(&vk.gamma_g2),
            vk_delta_2: g2_to_json(&vk.delta_g2),
            ic: vk.gamma_abc_g1.iter().map(g1_to_json).collect(),
        }
    }

    pub fn to_arkworks(&self) -> Result<VerifyingKey<Bn254>, ProofError> {
        if self.protocol != PROTOCOL || self.curve != CURVE {
            return Err(ProofError::InvalidVerifyingKey(format!(
                "unsupported {}/{}",
                self.protocol, self.curve
            )));
        }
        if self.ic.len() != self.n_public + 1 {
            return Err(ProofError::InvalidVerifyingKey(format!(
                "nPublic is {} but IC has {} points",
                self.n_public,
                self.ic.len()
            )));
        }

        let invalid = |what: &str| ProofError::InvalidVerifyingKey(format!("{} is not on the curve", what));
        let gamma_abc_g1 = self
            .ic
            .iter()
            .map(|p| g1_from_json(p)?.ok_or_else(|| invalid("IC")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VerifyingKey {
            alpha_g1: g1_from_json(&self.vk_alpha_1)?.ok_or_else(|| invalid("vk_alpha_1"))?,
            beta_g2: g2_from_json(&self.vk_beta_2)?.ok_or_else(|| invalid("vk_beta_2"))?,
            gamma_g2: g2_from_json(&self.vk_gamma_2)?.ok_or_else(|| invalid("vk_gamma_2"))?,
            delta_g2: g2_from_json(&self.vk_delta_2)?.ok_or_else(|| invalid("vk_delta_2"))?,
            gamma_abc_g1,
        })
    }
}

fn g1_to_json(p: &G1Affine) -> G1Json {
    if p.infinity {
        return ["0".to_string(), "1".to_string(), "0".to_string()];
    }
    [field_to_decimal(&p.x), field_to_decimal(&p.y), "1".to_string()]
}

fn g2_to_json(p: &G2Affine) -> G2Json {
    if p.infinity {
        return [
            ["0".to_string(), "0".to_string()],
            ["1".to_string(), "0".to_string()],
            ["0".to_string(), "0".to_string()],
        ];
    }
    [
        [field_to_decimal(&p.x.c0), field_to_decimal(&p.x.c1)],
        [field_to_decimal(&p.y.c0), field_to_decimal(&p.y.c1)],
        ["1".to_string(), "0".to_string()],
    ]
}

/// `Ok(None)` for a coordinate outside the base field
fn base_field(raw: &str) -> Result<Option<Fq>, ProofError> {
    let n = parse_decimal(raw).map_err(|e| ProofError::Parse(e.to_string()))?;
    Ok(biguint_to_field::<Fq>(&n).ok())
}

/// `Some(true)` for z = 1, `Some(false)` for z = 0, `None` otherwise
fn projective_z(limbs: &[&str]) -> Result<Option<bool>, ProofError> {
    let mut values = Vec::with_capacity(limbs.len());
    for raw in limbs {
        values.push(parse_decimal(raw).map_err(|e| ProofError::Parse(e.to_string()))?);
    }
    if !values[1..].iter().all(Zero::is_zero) {
        return Ok(None);
    }
    if values[0].is_one() {
        Ok(Some(true))
    } else if values[0].is_zero() {
        Ok(Some(false))
    } else {
        Ok(None)
    }
}

fn g1_from_json(p: &G1Json) -> Result<Option<G1Affine>, ProofError> {
    match projective_z(&[p[2].as_str()])? {
        Some(true) => {}
        Some(false) => return Ok(Some(G1Affine::identity())),
        None => return Ok(None),
    }

    let (x, y) = match (base_field(&p[0])?, base_field(&p[1])?) {
        (Some(x), Some(y)) => (x, y),
        _ => return Ok(None),
    };
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Ok(None);
    }
    Ok(Some(point))
}

fn g2_from_json(p: &G2Json) -> Result<Option<G2Affine>, ProofError> {
    match projective_z(&[p[2][0].as_str(), p[2][1].as_str()])? {
        Some(true) => {}
        Some(false) => return Ok(Some(G2Affine::identity())),
        None => return Ok(None),
    }

    let limbs = [&p[0][0], &p[0][1], &p[1][0], &p[1][1]];
    let mut coords = Vec::with_capacity(4);
    for raw in limbs {
        match base_field(raw)? {
            Some(f) => coords.push(f),
            None => return Ok(None),
        }
    }
    let x = Fq2::new(coords[0], coords[1]);
    let y = Fq2::new(coords[2], coords[3]);
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Ok(None);
    }
    Ok(Some(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    fn strings<const N: usize>(values: [&str; N]) -> [String; N] {
        values.map(|s| s.to_string())
    }

    #[test]
    fn test_reshape_pi_b_swaps_pairs() {
        let pi_b = [strings(["1", "2"]), strings(["3", "4"]), strings(["1", "0"])];
        assert_eq!(
            reshape_pi_b(&pi_b),
            [strings(["2", "1"]), strings(["4", "3"])]
        );
    }

    #[test]
    fn test_swap_pairs_is_involution() {
        let pairs = [strings(["11", "22"]), strings(["33", "44"])];
        assert_eq!(swap_pairs(&swap_pairs(&pairs)), pairs);
    }

    #[test]
    fn test_generator_points_decode() {
        let g1 = G1Affine::generator();
        let g2 = G2Affine::generator();

        assert_eq!(g1_from_json(&g1_to_json(&g1)).unwrap(), Some(g1));
        assert_eq!(g2_from_json(&g2_to_json(&g2)).unwrap(), Some(g2));
        assert_eq!(g1_to_json(&g1)[2], "1");
    }

    #[test]
    fn test_off_curve_point_is_none() {
        let mut json = g1_to_json(&G1Affine::generator());
        json[1] = "5".to_string();
        assert_eq!(g1_from_json(&json).unwrap(), None);
    }

    #[test]
    fn test_garbage_coordinate_is_parse_error() {
        let mut json = g1_to_json(&G1Affine::generator());
        json[0] = "0xdead".to_string();
        assert!(matches!(g1_from_json(&json), Err(ProofError::Parse(_))));
    }

    #[test]
    fn test_solidity_proof_restores_layout() {
        let g1 = g1_to_json(&G1Affine::generator());
        let proof = Groth16Proof {
            pi_a: g1.clone(),
            pi_b: g2_to_json(&G2Affine::generator()),
            pi_c: g1,
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
        };

        let solidity = proof.to_solidity();
        assert_eq!(solidity.b[0][0], proof.pi_b[0][1]);
        assert_eq!(solidity.to_groth16(), proof);
    }

    #[test]
    fn test_public_signals_accessors() {
        let signals = PublicSignals::from(strings(["10", "20", "30", "40"]));

        assert_eq!(signals.encrypted_sender_balance().unwrap(), BigUint::from(10u32));
        assert_eq!(signals.encrypted_sender_value().unwrap(), BigUint::from(20u32));
        assert_eq!(signals.encrypted_receiver_value().unwrap(), BigUint::from(30u32));
        assert_eq!(signals.auth_commitment().unwrap(), BigUint::from(40u32));
        assert_eq!(signals.to_array().unwrap()[3], "40");

        let json = serde_json::to_string(&signals).unwrap();
        assert_eq!(json, r#"["10","20","30","40"]"#);
    }

    #[test]
    fn test_public_signals_short_list() {
        let signals = PublicSignals::from(vec!["1".to_string()]);
        assert!(matches!(
            signals.auth_commitment(),
            Err(ProofError::SignalCount { .. })
        ));
        assert!(signals.to_array().is_err());
    }

    #[test]
    fn test_out_of_field_signal_is_none() {
        let modulus = crate::encoding::field_modulus::<Fr>().to_string();
        let signals = PublicSignals::from(vec!["1".to_string(), modulus]);
        assert_eq!(signals.to_fields().unwrap(), None);

        let signals = PublicSignals::from(vec!["abc".to_string()]);
        assert!(signals.to_fields().is_err());
    }

    #[test]
    fn test_verification_key_json_field_names() {
        let vk = VerifyingKey::<Bn254> {
            alpha_g1: G1Affine::generator(),
            beta_g2: G2Affine::generator(),
            gamma_g2: G2Affine::generator(),
            delta_g2: G2Affine::generator(),
            gamma_abc_g1: vec![G1Affine::generator(); 5],
        };
        let json = serde_json::to_value(VerificationKeyJson::from_arkworks(&vk)).unwrap();

        assert_eq!(json["nPublic"], 4);
        assert_eq!(json["IC"].as_array().unwrap().len(), 5);
        assert_eq!(json["protocol"], "groth16");
        assert!(json["vk_delta_2"].is_array());

        let back: VerificationKeyJson = serde_json::from_value(json).unwrap();
        assert_eq!(back.to_arkworks().unwrap(), vk);
    }
}
