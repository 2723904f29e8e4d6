use image::{Rgb, RgbImage};
use malaria_scan::{annotate, Pipeline, PipelineParameters};

fn main() -> anyhow::Result<()> {
    let mut img = RgbImage::from_pixel(600, 400, Rgb([240, 235, 235]));

    // One stained cell on the left, one healthy cell on the right
    let cells = [
        (150.0f32, 200.0f32, 77.0f32, Rgb([128, 0, 128])),
        (420.0, 200.0, 88.0, Rgb([230, 120, 140])),
    ];
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        for &(cx, cy, r, color) in &cells {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r * r {
                *pixel = color;
            }
        }
    }
    img.save("synthetic_smear.png")?;
    println!("Created synthetic_smear.png (600x400, two cells)");

    let mut params = PipelineParameters::default();
    params.cell_color = Some(malaria_scan::ColorThreshold {
        hue: malaria_scan::Interval::new(0.9, 1.0),
        saturation: malaria_scan::Interval::new(0.3, 1.0),
        value: malaria_scan::Interval::new(0.3, 1.0),
    });

    let input = image::DynamicImage::ImageRgb8(img);
    let result = Pipeline::new(params)?.run(&input)?;

    println!(
        "Detected {} infected and {} normal cells, parasitemia {:.1}%",
        result.infected_count(),
        result.normal_count(),
        result.parasitemia_rate * 100.0
    );
    for cell in result.infected.iter().chain(&result.normal) {
        println!(
            "  {} at ({:.0}, {:.0}) r={:.0} score={:.2}",
            cell.class.as_str(),
            cell.x,
            cell.y,
            cell.radius,
            cell.score
        );
    }

    annotate::render(&input, &result).save("synthetic_smear_annotated.png")?;
    println!("Saved synthetic_smear_annotated.png");
    Ok(())
}
