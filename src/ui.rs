use crate::models::SessionSummary;

pub fn render_index(session: &SessionSummary) -> String {
    let (badge, badge_kind) = if session.authenticated {
        ("Authenticated", "ok")
    } else {
        ("Not authenticated", "idle")
    };

    // The query text carries the user's free-text filter, so everything
    // substituted into the page goes through the HTML escaper first.
    INDEX_HTML
        .replace("{{TOTAL}}", &session.total.to_string())
        .replace(
            "{{PERIOD}}",
            &html_escape(session.period_label.as_deref().unwrap_or("No period selected")),
        )
        .replace(
            "{{QUERY}}",
            &html_escape(session.query.as_deref().unwrap_or("")),
        )
        .replace("{{BADGE}}", badge)
        .replace("{{BADGE_KIND}}", badge_kind)
}

fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Quote Requests Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f6f4ef;
      --bg-2: #cfe0f5;
      --ink: #24272b;
      --accent: #2f6fde;
      --accent-2: #1f3a57;
      --warn: #b7791f;
      --error: #c63b2b;
      --ok: #2d7a4b;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(31, 58, 87, 0.16);
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top right, var(--bg-2), transparent 55%),
        linear-gradient(135deg, var(--bg-1), #eef2f8 60%, #f4f1ea 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 28px 18px 44px;
    }

    .layout {
      width: min(1100px, 100%);
      margin: 0 auto;
      display: grid;
      grid-template-columns: 280px 1fr;
      gap: 22px;
    }

    .sidebar, .main {
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 26px;
    }

    .sidebar { display: grid; gap: 18px; align-content: start; }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.6rem, 3vw, 2.2rem);
      margin: 0;
    }

    h2 { margin: 0 0 8px; font-size: 1.05rem; }

    .field { display: grid; gap: 6px; }

    .field label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #7a7e85;
    }

    select, input {
      appearance: none;
      border: 1px solid rgba(31, 58, 87, 0.18);
      border-radius: 12px;
      padding: 10px 12px;
      font-size: 0.95rem;
      font-family: inherit;
      background: white;
      color: var(--ink);
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 14px 18px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
      box-shadow: 0 10px 24px rgba(47, 111, 222, 0.3);
      transition: transform 150ms ease;
    }

    button:active { transform: scale(0.98); }
    button[disabled] { opacity: 0.6; cursor: wait; }

    .badge {
      display: inline-block;
      padding: 6px 12px;
      border-radius: 999px;
      font-size: 0.8rem;
      font-weight: 600;
      background: rgba(31, 58, 87, 0.08);
      color: var(--accent-2);
    }

    .badge[data-kind="ok"] { background: rgba(45, 122, 75, 0.12); color: var(--ok); }

    .custom-dates { display: none; gap: 10px; }
    .custom-dates.visible { display: grid; }

    .main { display: grid; gap: 20px; align-content: start; }

    .metrics {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(170px, 1fr));
      gap: 14px;
    }

    .stat {
      background: white;
      border-radius: 16px;
      padding: 16px;
      border: 1px solid rgba(31, 58, 87, 0.08);
      display: grid;
      gap: 6px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #8b8f96;
    }

    .stat .value { font-size: 1.5rem; font-weight: 600; color: var(--accent-2); }

    .query-card {
      background: #101720;
      color: #d7e2ef;
      border-radius: 16px;
      padding: 14px 16px;
      font-family: "SFMono-Regular", Menlo, Consolas, monospace;
      font-size: 0.8rem;
      white-space: pre-wrap;
      word-break: break-word;
      min-height: 1.4em;
    }

    .chart-card {
      background: white;
      border-radius: 18px;
      padding: 16px;
      border: 1px solid rgba(31, 58, 87, 0.08);
    }

    #chart { width: 100%; height: 300px; display: block; }
    #chart text { font-family: "Space Grotesk", "Trebuchet MS", sans-serif; }

    .chart-bar { fill: var(--accent); }
    .chart-line { fill: none; stroke: var(--accent); stroke-width: 3; }
    .chart-point { fill: white; stroke: var(--accent); stroke-width: 2; }
    .chart-dot { fill: var(--accent); opacity: 0.75; }
    .chart-box { fill: rgba(47, 111, 222, 0.18); stroke: var(--accent-2); }
    .chart-whisker { stroke: var(--accent-2); }
    .chart-grid { stroke: rgba(31, 58, 87, 0.12); }
    .chart-label { fill: #7a7e85; font-size: 11px; }

    .status { font-size: 0.95rem; min-height: 1.3em; color: #6b6f76; }
    .status[data-type="error"] { color: var(--error); }
    .status[data-type="warn"] { color: var(--warn); }
    .status[data-type="ok"] { color: var(--ok); }

    @media (max-width: 820px) {
      .layout { grid-template-columns: 1fr; }
    }
  </style>
</head>
<body>
  <div class="layout">
    <aside class="sidebar">
      <div>
        <h2>Authentication</h2>
        <span id="badge" class="badge" data-kind="{{BADGE_KIND}}">{{BADGE}}</span>
      </div>

      <div class="field">
        <label for="preset">Period</label>
        <select id="preset">
          <option value="current_week">Current week</option>
          <option value="current_month">Current month</option>
          <option value="current_quarter">Current quarter</option>
          <option value="last_7_days" selected>Last 7 days</option>
          <option value="last_30_days">Last 30 days</option>
          <option value="last_90_days">Last 90 days</option>
          <option value="last_3_years">Last 3 years</option>
          <option value="custom">Custom range</option>
        </select>
      </div>

      <div id="custom-dates" class="custom-dates">
        <div class="field">
          <label for="start">Start date</label>
          <input id="start" type="date" />
        </div>
        <div class="field">
          <label for="end">End date</label>
          <input id="end" type="date" />
        </div>
      </div>

      <div class="field">
        <label for="name-filter">Name or Id filter</label>
        <input id="name-filter" type="text" placeholder="optional" />
      </div>

      <div class="field">
        <label for="chart-kind">Chart type</label>
        <select id="chart-kind">
          <option value="bar" selected>Bar chart</option>
          <option value="pie">Pie chart</option>
          <option value="scatter">Scatter plot</option>
          <option value="line">Line chart</option>
          <option value="histogram">Histogram</option>
          <option value="box">Box plot</option>
        </select>
      </div>

      <div class="field">
        <label for="group-by">Group by</label>
        <select id="group-by">
          <option value="date" selected>Creation date</option>
          <option value="stage">Stage</option>
        </select>
      </div>

      <button id="run" type="button">Authenticate &amp; Run Query</button>
      <div class="status" id="sidebar-status"></div>
    </aside>

    <main class="main">
      <header>
        <h1>Quote Requests Dashboard</h1>
      </header>

      <section class="metrics">
        <div class="stat">
          <span class="label">Total opportunities</span>
          <span id="total" class="value">{{TOTAL}}</span>
        </div>
        <div class="stat">
          <span class="label">Period</span>
          <span id="period" class="value" style="font-size:1.05rem">{{PERIOD}}</span>
        </div>
      </section>

      <section>
        <h2>SOQL Query</h2>
        <div id="query" class="query-card">{{QUERY}}</div>
      </section>

      <section>
        <h2 id="chart-title">Visualizations</h2>
        <div class="chart-card">
          <svg id="chart" viewBox="0 0 640 300" aria-label="Opportunity chart" role="img"></svg>
        </div>
      </section>

      <div class="status" id="status"></div>
    </main>
  </div>

  <script>
    const presetEl = document.getElementById('preset');
    const customEl = document.getElementById('custom-dates');
    const startEl = document.getElementById('start');
    const endEl = document.getElementById('end');
    const filterEl = document.getElementById('name-filter');
    const chartKindEl = document.getElementById('chart-kind');
    const groupEl = document.getElementById('group-by');
    const runEl = document.getElementById('run');
    const badgeEl = document.getElementById('badge');
    const totalEl = document.getElementById('total');
    const periodEl = document.getElementById('period');
    const queryEl = document.getElementById('query');
    const chartEl = document.getElementById('chart');
    const chartTitleEl = document.getElementById('chart-title');
    const statusEl = document.getElementById('status');
    const sidebarStatusEl = document.getElementById('sidebar-status');

    let authenticated = false;

    const setStatus = (el, message, type) => {
      el.textContent = message;
      el.dataset.type = type || '';
    };

    const updateSession = (session) => {
      authenticated = session.authenticated;
      totalEl.textContent = session.total;
      periodEl.textContent = session.period_label || 'No period selected';
      queryEl.textContent = session.query || '';
      badgeEl.textContent = authenticated ? 'Authenticated' : 'Not authenticated';
      badgeEl.dataset.kind = authenticated ? 'ok' : 'idle';
      runEl.textContent = authenticated ? 'Update' : 'Authenticate & Run Query';
    };

    const width = 640;
    const height = 300;
    const padX = 50;
    const padY = 36;

    const emptyChart = (message) => {
      chartEl.innerHTML = `<text class="chart-label" x="50%" y="50%" text-anchor="middle">${message}</text>`;
    };

    const gridLines = (min, max, toY) => {
      let out = '';
      const ticks = 4;
      for (let i = 0; i <= ticks; i += 1) {
        const value = min + ((max - min) * i) / ticks;
        const y = toY(value);
        out += `<line class="chart-grid" x1="${padX}" y1="${y}" x2="${width - padX}" y2="${y}" />`;
        out += `<text class="chart-label" x="${padX - 8}" y="${y + 4}" text-anchor="end">${Math.round(value)}</text>`;
      }
      return out;
    };

    const renderBars = (points) => {
      if (!points.length) { return emptyChart('No data'); }
      const max = Math.max(...points.map((p) => p.count), 1);
      const toY = (v) => height - padY - ((height - padY * 2) * v) / max;
      const band = (width - padX * 2) / points.length;
      const barWidth = Math.max(band * 0.6, 4);
      let svg = gridLines(0, max, toY);
      points.forEach((p, i) => {
        const x = padX + i * band + (band - barWidth) / 2;
        const y = toY(p.count);
        svg += `<rect class="chart-bar" x="${x.toFixed(1)}" y="${y.toFixed(1)}" width="${barWidth.toFixed(1)}" height="${(height - padY - y).toFixed(1)}" rx="3" />`;
        if (points.length <= 14 || i % 2 === 0) {
          svg += `<text class="chart-label" x="${(x + barWidth / 2).toFixed(1)}" y="${height - padY + 16}" text-anchor="middle">${p.label.slice(5) || p.label}</text>`;
        }
      });
      chartEl.innerHTML = svg;
    };

    const renderLine = (points) => {
      if (!points.length) { return emptyChart('No data'); }
      const max = Math.max(...points.map((p) => p.count), 1);
      const toY = (v) => height - padY - ((height - padY * 2) * v) / max;
      const step = points.length > 1 ? (width - padX * 2) / (points.length - 1) : 0;
      const toX = (i) => padX + i * step;
      const path = points
        .map((p, i) => `${i === 0 ? 'M' : 'L'} ${toX(i).toFixed(1)} ${toY(p.count).toFixed(1)}`)
        .join(' ');
      let svg = gridLines(0, max, toY);
      svg += `<path class="chart-line" d="${path}" />`;
      points.forEach((p, i) => {
        svg += `<circle class="chart-point" cx="${toX(i).toFixed(1)}" cy="${toY(p.count).toFixed(1)}" r="4" />`;
        if (points.length <= 14 || i % 2 === 0) {
          svg += `<text class="chart-label" x="${toX(i).toFixed(1)}" y="${height - padY + 16}" text-anchor="middle">${p.label.slice(5) || p.label}</text>`;
        }
      });
      chartEl.innerHTML = svg;
    };

    const pieColors = ['#2f6fde', '#1f3a57', '#6ca0f0', '#b7791f', '#2d7a4b', '#c63b2b'];

    const renderPie = (slices) => {
      if (!slices.length) { return emptyChart('No data'); }
      const total = slices.reduce((acc, s) => acc + s.count, 0);
      const cx = width / 2 - 90;
      const cy = height / 2;
      const r = 100;
      let angle = -Math.PI / 2;
      let svg = '';
      slices.forEach((slice, i) => {
        const span = (slice.count / total) * Math.PI * 2;
        const x1 = cx + r * Math.cos(angle);
        const y1 = cy + r * Math.sin(angle);
        angle += span;
        const x2 = cx + r * Math.cos(angle);
        const y2 = cy + r * Math.sin(angle);
        const large = span > Math.PI ? 1 : 0;
        const color = pieColors[i % pieColors.length];
        if (slices.length === 1) {
          svg += `<circle cx="${cx}" cy="${cy}" r="${r}" fill="${color}" />`;
        } else {
          svg += `<path d="M ${cx} ${cy} L ${x1.toFixed(1)} ${y1.toFixed(1)} A ${r} ${r} 0 ${large} 1 ${x2.toFixed(1)} ${y2.toFixed(1)} Z" fill="${color}" />`;
        }
        const ly = 60 + i * 22;
        svg += `<rect x="${width - 220}" y="${ly - 11}" width="12" height="12" rx="3" fill="${color}" />`;
        svg += `<text class="chart-label" x="${width - 202}" y="${ly}" text-anchor="start">${slice.label} (${slice.count})</text>`;
      });
      chartEl.innerHTML = svg;
    };

    const renderScatter = (points) => {
      if (!points.length) { return emptyChart('No data'); }
      const min = points[0].timestamp;
      const max = points[points.length - 1].timestamp;
      const span = Math.max(max - min, 1);
      const toX = (t) => padX + ((width - padX * 2) * (t - min)) / span;
      const stepY = (height - padY * 2) / Math.max(points.length, 1);
      let svg = '';
      points.forEach((p, i) => {
        const y = height - padY - stepY * (i + 0.5);
        svg += `<circle class="chart-dot" cx="${toX(p.timestamp).toFixed(1)}" cy="${y.toFixed(1)}" r="5"><title>${p.id} (${p.date})</title></circle>`;
      });
      svg += `<text class="chart-label" x="${padX}" y="${height - padY + 16}" text-anchor="start">${points[0].date}</text>`;
      svg += `<text class="chart-label" x="${width - padX}" y="${height - padY + 16}" text-anchor="end">${points[points.length - 1].date}</text>`;
      chartEl.innerHTML = svg;
    };

    const renderBox = (groups) => {
      if (!groups.length) { return emptyChart('No data'); }
      const min = Math.min(...groups.map((g) => g.min));
      const max = Math.max(...groups.map((g) => g.max));
      const span = Math.max(max - min, 1);
      const toY = (t) => height - padY - ((height - padY * 2) * (t - min)) / span;
      const band = (width - padX * 2) / groups.length;
      let svg = '';
      groups.forEach((g, i) => {
        const cx = padX + band * (i + 0.5);
        const half = Math.min(band * 0.25, 50);
        svg += `<line class="chart-whisker" x1="${cx}" y1="${toY(g.min)}" x2="${cx}" y2="${toY(g.max)}" />`;
        svg += `<line class="chart-whisker" x1="${cx - half}" y1="${toY(g.min)}" x2="${cx + half}" y2="${toY(g.min)}" />`;
        svg += `<line class="chart-whisker" x1="${cx - half}" y1="${toY(g.max)}" x2="${cx + half}" y2="${toY(g.max)}" />`;
        const top = toY(g.q3);
        const bottom = toY(g.q1);
        svg += `<rect class="chart-box" x="${cx - half}" y="${top}" width="${half * 2}" height="${Math.max(bottom - top, 2)}" rx="3" />`;
        svg += `<line class="chart-whisker" x1="${cx - half}" y1="${toY(g.median)}" x2="${cx + half}" y2="${toY(g.median)}" stroke-width="2" />`;
        svg += `<text class="chart-label" x="${cx}" y="${height - padY + 16}" text-anchor="middle">${g.stage}</text>`;
      });
      svg += `<text class="chart-label" x="${padX - 8}" y="${toY(min) + 4}" text-anchor="end">${groups[0].min_date}</text>`;
      chartEl.innerHTML = svg;
    };

    const loadChart = async () => {
      if (!authenticated) { return; }
      const kind = chartKindEl.value;
      const group = groupEl.value;
      const res = await fetch(`/api/chart?kind=${kind}&group=${group}`);
      if (!res.ok) {
        setStatus(statusEl, await res.text(), 'error');
        return;
      }
      const data = await res.json();
      chartTitleEl.textContent = data.title;
      if (data.kind === 'bar' || data.kind === 'histogram') {
        renderBars(data.points);
      } else if (data.kind === 'line') {
        renderLine(data.points);
      } else if (data.kind === 'pie') {
        renderPie(data.slices);
      } else if (data.kind === 'scatter') {
        renderScatter(data.points);
      } else if (data.kind === 'box') {
        renderBox(data.groups);
      }
    };

    const loadSession = async () => {
      const res = await fetch('/api/session');
      if (!res.ok) { throw new Error('Unable to load session'); }
      updateSession(await res.json());
    };

    const refresh = async () => {
      runEl.disabled = true;
      setStatus(sidebarStatusEl, 'Running query...', '');
      const body = { preset: presetEl.value, name_filter: filterEl.value || null };
      if (presetEl.value === 'custom') {
        body.start = startEl.value || null;
        body.end = endEl.value || null;
      }
      try {
        const res = await fetch('/api/refresh', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify(body)
        });
        if (!res.ok) {
          setStatus(sidebarStatusEl, await res.text(), 'error');
          return;
        }
        const payload = await res.json();
        updateSession(payload.session);
        if (payload.status === 'empty') {
          setStatus(sidebarStatusEl, payload.message, 'warn');
        } else if (payload.status === 'unchanged') {
          setStatus(sidebarStatusEl, 'Period unchanged, using cached data.', 'ok');
        } else {
          setStatus(sidebarStatusEl, 'Query complete.', 'ok');
        }
        await loadChart();
      } catch (err) {
        setStatus(sidebarStatusEl, err.message, 'error');
      } finally {
        runEl.disabled = false;
      }
    };

    presetEl.addEventListener('change', () => {
      customEl.classList.toggle('visible', presetEl.value === 'custom');
    });
    chartKindEl.addEventListener('change', () => loadChart().catch((err) => setStatus(statusEl, err.message, 'error')));
    groupEl.addEventListener('change', () => loadChart().catch((err) => setStatus(statusEl, err.message, 'error')));
    runEl.addEventListener('click', () => refresh());

    loadSession()
      .then(() => {
        if (!authenticated) {
          setStatus(statusEl, 'Authenticate first to view data and charts.', 'warn');
        }
        return loadChart();
      })
      .catch((err) => setStatus(statusEl, err.message, 'error'));
  </script>
</body>
</html>
"#;
