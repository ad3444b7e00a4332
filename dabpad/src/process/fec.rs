//! Reed-Solomon codec over GF(2^m).
//!
//! DAB+ protects each superframe with interleaved RS(120,110) codewords, a
//! shortened RS(255,245) code with 135 padding symbols (TS 102 563 clause 6).
//! Arithmetic uses log/antilog tables; polynomials are kept in index form
//! where `nn` stands for the logarithm of zero.

use anyhow::{Result, bail, ensure};

use crate::utils::errors::FecError;

/// Symbol size of the DAB+ code.
pub const DAB_PLUS_SYMSIZE: u32 = 8;
/// x^8 + x^4 + x^3 + x^2 + 1
pub const DAB_PLUS_GFPOLY: u32 = 0x11D;
pub const DAB_PLUS_FCR: usize = 0;
pub const DAB_PLUS_PRIM: usize = 1;
pub const DAB_PLUS_NROOTS: usize = 10;
pub const DAB_PLUS_PAD: usize = 135;

/// Length of a DAB+ RS codeword in bytes.
pub const DAB_PLUS_CODEWORD_LEN: usize = 120;

/// Reed-Solomon encoder/decoder for symbols of up to 8 bits.
///
/// Decoding reuses internal scratch buffers and therefore takes `&mut self`.
#[derive(Debug, Clone)]
pub struct ReedSolomon {
    mm: u32,
    nn: usize,
    fcr: usize,
    prim: usize,
    iprim: usize,
    nroots: usize,
    pad: usize,

    alpha_to: Vec<usize>,
    index_of: Vec<usize>,
    /// Generator polynomial in index form.
    genpoly: Vec<usize>,

    lambda: Vec<usize>,
    syndromes: Vec<usize>,
    b: Vec<usize>,
    t: Vec<usize>,
    omega: Vec<usize>,
    reg: Vec<usize>,
    root: Vec<usize>,
    loc: Vec<usize>,
}

impl ReedSolomon {
    /// Builds a codec.
    ///
    /// # Arguments
    ///
    /// * `symsize` - Bits per symbol, 1 to 8
    /// * `gfpoly` - Field generator polynomial
    /// * `fcr` - First consecutive root of the code generator, index form
    /// * `prim` - Primitive element used to generate roots, index form
    /// * `nroots` - Number of parity symbols
    /// * `pad` - Leading zero symbols omitted from shortened codewords
    pub fn new(
        symsize: u32,
        gfpoly: u32,
        fcr: usize,
        prim: usize,
        nroots: usize,
        pad: usize,
    ) -> Result<Self> {
        ensure!(
            (1..=8).contains(&symsize),
            FecError::InvalidSymbolSize(symsize)
        );

        let nn = (1usize << symsize) - 1;

        ensure!(fcr <= nn, FecError::InvalidFirstRoot { fcr, nn });
        ensure!(
            prim != 0 && prim <= nn,
            FecError::InvalidPrimitive { prim, nn }
        );
        ensure!(
            nroots != 0 && nroots <= nn,
            FecError::InvalidRootCount { nroots, nn }
        );
        ensure!(
            pad < nn - nroots,
            FecError::InvalidPadding {
                pad,
                limit: nn - nroots,
            }
        );

        let mut alpha_to = vec![0; nn + 1];
        let mut index_of = vec![0; nn + 1];

        index_of[0] = nn;
        alpha_to[nn] = 0;

        let mut sr = 1usize;
        for i in 0..nn {
            index_of[sr] = i;
            alpha_to[i] = sr;
            sr <<= 1;
            if sr & (1 << symsize) != 0 {
                sr ^= gfpoly as usize;
            }
            sr &= nn;
        }

        if sr != 1 {
            bail!(FecError::NonPrimitivePolynomial(gfpoly));
        }

        let mut rs = Self {
            mm: symsize,
            nn,
            fcr,
            prim,
            iprim: 0,
            nroots,
            pad,
            alpha_to,
            index_of,
            genpoly: vec![0; nroots + 1],
            lambda: vec![0; nroots + 1],
            syndromes: vec![0; nroots],
            b: vec![0; nroots + 1],
            t: vec![0; nroots + 1],
            omega: vec![0; nroots + 1],
            reg: vec![0; nroots + 1],
            root: vec![0; nroots],
            loc: vec![0; nroots],
        };

        // prim-th root of 1, used in decoding
        let mut iprim = 1;
        while iprim % prim != 0 {
            iprim += nn;
        }
        rs.iprim = iprim / prim;

        rs.build_genpoly();

        Ok(rs)
    }

    /// The RS(120,110) code protecting DAB+ superframes.
    pub fn dab_plus() -> Result<Self> {
        Self::new(
            DAB_PLUS_SYMSIZE,
            DAB_PLUS_GFPOLY,
            DAB_PLUS_FCR,
            DAB_PLUS_PRIM,
            DAB_PLUS_NROOTS,
            DAB_PLUS_PAD,
        )
    }

    fn build_genpoly(&mut self) {
        let nroots = self.nroots;
        let genpoly = &mut self.genpoly;

        genpoly[0] = 1;
        let mut root = self.fcr * self.prim;
        for i in 0..nroots {
            genpoly[i + 1] = 1;

            // multiply by (x + alpha^root)
            for j in (1..=i).rev() {
                genpoly[j] = if genpoly[j] != 0 {
                    genpoly[j - 1]
                        ^ self.alpha_to[modnn(self.nn, self.mm, self.index_of[genpoly[j]] + root)]
                } else {
                    genpoly[j - 1]
                };
            }
            genpoly[0] = self.alpha_to[modnn(self.nn, self.mm, self.index_of[genpoly[0]] + root)];

            root += self.prim;
        }

        for coef in genpoly.iter_mut() {
            *coef = self.index_of[*coef];
        }
    }

    #[inline(always)]
    fn modnn(&self, x: usize) -> usize {
        modnn(self.nn, self.mm, x)
    }

    /// Number of parity symbols.
    pub fn nroots(&self) -> usize {
        self.nroots
    }

    /// Length of a (shortened) codeword.
    pub fn codeword_len(&self) -> usize {
        self.nn - self.pad
    }

    /// Number of data symbols per codeword.
    pub fn data_len(&self) -> usize {
        self.nn - self.nroots - self.pad
    }

    /// Computes the parity symbols for `data_len()` data symbols.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        ensure!(
            data.len() == self.data_len(),
            FecError::CodewordLength {
                found: data.len(),
                expected: self.data_len(),
            }
        );

        let nroots = self.nroots;
        let a0 = self.nn;
        let mut parity = vec![0usize; nroots];

        for &d in data {
            let feedback = self.index_of[(d as usize) ^ parity[0]];

            if feedback != a0 {
                for j in 1..nroots {
                    parity[j] ^= self.alpha_to[self.modnn(feedback + self.genpoly[nroots - j])];
                }
            }

            parity.copy_within(1.., 0);
            parity[nroots - 1] = if feedback != a0 {
                self.alpha_to[self.modnn(feedback + self.genpoly[0])]
            } else {
                0
            };
        }

        Ok(parity.into_iter().map(|p| p as u8).collect())
    }

    /// Corrects a codeword in place.
    ///
    /// `erasures` lists codeword positions known to be unreliable. Returns the
    /// number of corrected symbols (including erasures); a clean codeword
    /// returns `Ok(0)` and stays untouched.
    pub fn decode(&mut self, data: &mut [u8], erasures: &[usize]) -> Result<usize> {
        let len = self.codeword_len();
        ensure!(
            data.len() == len,
            FecError::CodewordLength {
                found: data.len(),
                expected: len,
            }
        );
        ensure!(
            erasures.len() <= self.nroots,
            FecError::TooManyErasures {
                count: erasures.len(),
                max: self.nroots,
            }
        );
        if let Some(&position) = erasures.iter().find(|&&p| p >= len) {
            bail!(FecError::ErasureOutOfRange { position, len });
        }

        let nn = self.nn;
        let a0 = nn;
        let nroots = self.nroots;
        let no_eras = erasures.len();

        // syndromes: evaluate data(x) at the roots of g(x)
        self.syndromes.fill(data[0] as usize);
        for &d in &data[1..] {
            for i in 0..nroots {
                let s = self.syndromes[i];
                self.syndromes[i] = if s == 0 {
                    d as usize
                } else {
                    d as usize
                        ^ self.alpha_to
                            [self.modnn(self.index_of[s] + (self.fcr + i) * self.prim)]
                };
            }
        }

        let mut syn_error = 0;
        for i in 0..nroots {
            syn_error |= self.syndromes[i];
            self.syndromes[i] = self.index_of[self.syndromes[i]];
        }

        if syn_error == 0 {
            return Ok(0);
        }

        self.lambda.fill(0);
        self.lambda[0] = 1;

        if let Some((&first, rest)) = erasures.split_first() {
            // erasure locator polynomial
            self.lambda[1] =
                self.alpha_to[self.modnn(self.prim * (nn - 1 - (first + self.pad)))];
            for (i, &position) in rest.iter().enumerate() {
                let u = self.modnn(self.prim * (nn - 1 - (position + self.pad)));
                for j in (1..=i + 2).rev() {
                    let tmp = self.index_of[self.lambda[j - 1]];
                    if tmp != a0 {
                        self.lambda[j] ^= self.alpha_to[self.modnn(u + tmp)];
                    }
                }
            }
        }

        for i in 0..=nroots {
            self.b[i] = self.index_of[self.lambda[i]];
        }

        // Berlekamp-Massey
        let mut el = no_eras;
        for r in no_eras + 1..=nroots {
            let mut discr_r = 0;
            for i in 0..r {
                let s = self.syndromes[r - i - 1];
                if self.lambda[i] != 0 && s != a0 {
                    discr_r ^= self.alpha_to[self.modnn(self.index_of[self.lambda[i]] + s)];
                }
            }
            let discr_r = self.index_of[discr_r];

            if discr_r == a0 {
                self.b.copy_within(0..nroots, 1);
                self.b[0] = a0;
                continue;
            }

            self.t[0] = self.lambda[0];
            for i in 0..nroots {
                self.t[i + 1] = if self.b[i] != a0 {
                    self.lambda[i + 1] ^ self.alpha_to[self.modnn(discr_r + self.b[i])]
                } else {
                    self.lambda[i + 1]
                };
            }

            if 2 * el < r + no_eras {
                el = r + no_eras - el;
                for i in 0..=nroots {
                    self.b[i] = if self.lambda[i] == 0 {
                        a0
                    } else {
                        self.modnn(self.index_of[self.lambda[i]] + nn - discr_r)
                    };
                }
            } else {
                self.b.copy_within(0..nroots, 1);
                self.b[0] = a0;
            }

            self.lambda.copy_from_slice(&self.t);
        }

        let mut deg_lambda = 0;
        for i in 0..=nroots {
            self.lambda[i] = self.index_of[self.lambda[i]];
            if self.lambda[i] != a0 {
                deg_lambda = i;
            }
        }

        if deg_lambda == 0 {
            return Err(FecError::Uncorrectable.into());
        }

        // Chien search for the roots of lambda(x)
        self.reg[1..].copy_from_slice(&self.lambda[1..]);
        let mut count = 0;
        let mut k = self.iprim - 1;
        for i in 1..=nn {
            let mut q = 1;
            for j in (1..=deg_lambda).rev() {
                if self.reg[j] != a0 {
                    self.reg[j] = self.modnn(self.reg[j] + j);
                    q ^= self.alpha_to[self.reg[j]];
                }
            }

            if q == 0 {
                self.root[count] = i;
                self.loc[count] = k;
                count += 1;
                if count == deg_lambda {
                    break;
                }
            }

            k = self.modnn(k + self.iprim);
        }

        if count != deg_lambda {
            return Err(FecError::Uncorrectable.into());
        }

        // roots in the implicit zero padding cannot be corrected
        if self.loc[..count].iter().any(|&loc| loc < self.pad) {
            return Err(FecError::Uncorrectable.into());
        }

        // omega(x) = s(x) * lambda(x) mod x^nroots, index form
        let deg_omega = deg_lambda - 1;
        for i in 0..=deg_omega {
            let mut tmp = 0;
            for j in 0..=i {
                let s = self.syndromes[i - j];
                if s != a0 && self.lambda[j] != a0 {
                    tmp ^= self.alpha_to[self.modnn(s + self.lambda[j])];
                }
            }
            self.omega[i] = self.index_of[tmp];
        }

        // Forney: num1 = omega(1/X), num2 = (1/X)^(fcr-1), den = lambda'(1/X)
        for j in (0..count).rev() {
            let root = self.root[j];

            let mut num1 = 0;
            for i in (0..=deg_omega).rev() {
                if self.omega[i] != a0 {
                    num1 ^= self.alpha_to[self.modnn(self.omega[i] + i * root)];
                }
            }

            let num2 = self.alpha_to[self.modnn(root * self.fcr + nn - root)];

            let mut den = 0;
            let mut i = deg_lambda.min(nroots - 1) & !1;
            loop {
                if self.lambda[i + 1] != a0 {
                    den ^= self.alpha_to[self.modnn(self.lambda[i + 1] + i * root)];
                }
                if i < 2 {
                    break;
                }
                i -= 2;
            }

            if den == 0 {
                return Err(FecError::Uncorrectable.into());
            }

            let loc = self.loc[j];
            if num1 != 0 {
                data[loc - self.pad] ^= self.alpha_to[self.modnn(
                    self.index_of[num1] + self.index_of[num2] + nn - self.index_of[den],
                )] as u8;
            }
        }

        Ok(count)
    }
}

/// Reduces `x` modulo `nn = 2^mm - 1` without division.
#[inline(always)]
fn modnn(nn: usize, mm: u32, mut x: usize) -> usize {
    while x >= nn {
        x -= nn;
        x = (x >> mm) + (x & nn);
    }

    x
}
