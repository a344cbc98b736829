// LLM-friendly documentation endpoint content.

pub const LLMS_TXT: &str = r#"# Reward Rotation API
> Weekly reward rotation lookup: which rotation is live, when it turns over, and what each battle zone drops.

## API Base URL
/api/

## Rotation rules
- A new rotation starts every Tuesday at 16:00 in the server's configured timezone.
- Rotations are numbered 1..N (N = 20 by default) and wrap around.
- Windows are half-open: [start, end).

## Key Endpoints
- GET /api/rotation - Current (or offset) rotation, its window, time remaining, and matching rewards
  - offset: weeks relative to now, clamped to -(N-1)..(N-1)
  - locale: ko | en (defaults to Accept-Language, then en)
  - map, rewardType, reactorElementType, weaponRoundsType, archeType: exact-match filters ("all" = any)
  - sortBy: reward_type | battle_zone_name
- GET /api/rotation/maps - Map names for a locale
- GET /metrics - Prometheus metrics
- GET /health - Liveness check
"#;
