//! Adaptive palette quantization.
//!
//! A [`Quantizer`] maps a slice of RGB pixels onto a small palette and
//! reports, for every input pixel, which palette entry it was assigned to.
//! Quantizers are pure: they keep no state between calls, so the same input
//! always produces the same palette, and a single quantizer may be shared
//! across threads.
//!
//! [`MedianCut`] is the default quantizer.

use std::collections::{BTreeMap, HashMap};

use image::{Rgb, RgbImage};

use crate::color::Color;

/// Largest palette an indexed image can hold.
pub const MAX_PALETTE_SIZE: usize = 256;

/// The result of quantizing a pixel buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quantization {
    /// Palette entries, in palette-index order.
    pub palette: Vec<Color>,
    /// Palette index of each input pixel, in input order.
    pub indices: Vec<u8>,
}

impl Quantization {
    /// Render the quantized pixels back into an image of the given size.
    ///
    /// Returns `None` if `width * height` does not match the number of
    /// indices or an index points outside the palette.
    pub fn to_image(&self, width: u32, height: u32) -> Option<RgbImage> {
        if (width as usize) * (height as usize) != self.indices.len() {
            return None;
        }

        let mut buffer = Vec::with_capacity(self.indices.len() * 3);
        for &index in &self.indices {
            let color = self.palette.get(index as usize)?;
            buffer.extend_from_slice(&color.components());
        }
        RgbImage::from_raw(width, height, buffer)
    }
}

/// Reduces a set of pixels to a bounded palette.
///
/// Implementations must be deterministic and must not produce more than
/// `palette_size` (or [`MAX_PALETTE_SIZE`]) entries.
pub trait Quantizer: Send + Sync {
    /// Quantize `pixels` to at most `palette_size` colors.
    ///
    /// An empty input yields an empty [`Quantization`].
    fn quantize(&self, pixels: &[Rgb<u8>], palette_size: usize) -> Quantization;
}

/// Median-cut quantizer.
///
/// Starting from a single box holding every distinct color, the box with the
/// largest pixel population is split along its widest channel at the
/// population-weighted median until the palette is full or no box holds
/// more than one distinct color. Each palette entry is the weighted mean of
/// its box; boxes with equal means are merged into one entry.
///
/// Ties are resolved by position (earliest box, then the R, G, B channel
/// order), so the output is fully determined by the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianCut;

#[derive(Debug, Clone, Copy)]
struct ColorBox {
    start: usize,
    end: usize,
    population: u64,
}

impl ColorBox {
    fn is_splittable(&self) -> bool {
        self.end - self.start > 1
    }
}

impl Quantizer for MedianCut {
    fn quantize(&self, pixels: &[Rgb<u8>], palette_size: usize) -> Quantization {
        let target = palette_size.min(MAX_PALETTE_SIZE);
        if pixels.is_empty() || target == 0 {
            return Quantization::default();
        }

        let mut entries = histogram(pixels);
        let mut boxes = vec![ColorBox {
            start: 0,
            end: entries.len(),
            population: pixels.len() as u64,
        }];

        while boxes.len() < target {
            let candidate = boxes
                .iter()
                .enumerate()
                .filter(|(_, color_box)| color_box.is_splittable())
                .max_by(|(left_index, left), (right_index, right)| {
                    left.population
                        .cmp(&right.population)
                        .then(right_index.cmp(left_index))
                })
                .map(|(index, _)| index);

            let Some(index) = candidate else {
                break;
            };

            let (lower, upper) = split_box(&mut entries, boxes[index]);
            boxes[index] = lower;
            boxes.push(upper);
        }

        // Boxes whose means coincide share the first palette entry with that
        // color, so entries stay distinct and indices stay dense.
        let mut palette: Vec<Color> = Vec::with_capacity(boxes.len());
        let mut lookup: HashMap<Color, u8> = HashMap::with_capacity(entries.len());
        for color_box in &boxes {
            let members = &entries[color_box.start..color_box.end];
            let mean = weighted_mean(members, color_box.population);
            let index = match palette.iter().position(|entry| *entry == mean) {
                Some(existing) => existing,
                None => {
                    palette.push(mean);
                    palette.len() - 1
                }
            };
            for (color, _) in members {
                lookup.insert(*color, index as u8);
            }
        }

        let indices = pixels
            .iter()
            .map(|pixel| lookup.get(&Color::from(*pixel)).copied().unwrap_or_default())
            .collect();

        Quantization { palette, indices }
    }
}

/// Distinct colors with their pixel counts, sorted by color.
fn histogram(pixels: &[Rgb<u8>]) -> Vec<(Color, u64)> {
    let mut counts: BTreeMap<Color, u64> = BTreeMap::new();
    for pixel in pixels {
        *counts.entry(Color::from(*pixel)).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

/// Split `color_box` in place at its weighted median along the widest channel.
fn split_box(entries: &mut [(Color, u64)], color_box: ColorBox) -> (ColorBox, ColorBox) {
    let members = &mut entries[color_box.start..color_box.end];
    let channel = widest_channel(members);
    members.sort_by_key(|(color, _)| (color.components()[channel], *color));

    let mut accumulated = 0u64;
    let mut cut = members.len() - 1;
    for (offset, (_, count)) in members.iter().enumerate() {
        accumulated += count;
        if accumulated * 2 >= color_box.population {
            cut = offset + 1;
            break;
        }
    }
    let cut = cut.clamp(1, members.len() - 1);
    let lower_population: u64 = members[..cut].iter().map(|(_, count)| count).sum();

    (
        ColorBox {
            start: color_box.start,
            end: color_box.start + cut,
            population: lower_population,
        },
        ColorBox {
            start: color_box.start + cut,
            end: color_box.end,
            population: color_box.population - lower_population,
        },
    )
}

fn widest_channel(members: &[(Color, u64)]) -> usize {
    let mut minimum = [u8::MAX; 3];
    let mut maximum = [u8::MIN; 3];
    for (color, _) in members {
        for (channel, value) in color.components().into_iter().enumerate() {
            minimum[channel] = minimum[channel].min(value);
            maximum[channel] = maximum[channel].max(value);
        }
    }

    let mut widest = 0;
    for channel in 1..3 {
        if maximum[channel] - minimum[channel] > maximum[widest] - minimum[widest] {
            widest = channel;
        }
    }
    widest
}

fn weighted_mean(members: &[(Color, u64)], population: u64) -> Color {
    let mut sums = [0u64; 3];
    for (color, count) in members {
        for (sum, value) in sums.iter_mut().zip(color.components()) {
            *sum += u64::from(value) * count;
        }
    }

    let population = population.max(1);
    let [r, g, b] = sums.map(|sum| ((sum + population / 2) / population).min(255) as u8);
    Color::new(r, g, b)
}
